//! Login / logout commands.

use anyhow::Result;
use rede_app::{AppError, SignUpForm};

use super::Shell;
use crate::render;

/// Sign in and store the credential.
pub async fn login(shell: &Shell, email: &str, password: &str) -> Result<()> {
    match shell.app.session().sign_in(email, password).await {
        Ok(session) => {
            println!("Signed in as {}.", session.identity.name);
            Ok(())
        }
        Err(e) => anyhow::bail!("Login failed: {}", shell.app.report(AppError::Auth(e))),
    }
}

pub async fn register(shell: &Shell, form: &SignUpForm) -> Result<()> {
    match shell.app.session().sign_up(form).await {
        Ok(session) => {
            println!("Welcome, {}.", session.identity.name);
            Ok(())
        }
        Err(e) => anyhow::bail!("Registration failed: {}", shell.app.report(AppError::Auth(e))),
    }
}

/// Sign out. Succeeds when already signed out.
pub fn logout(shell: &Shell) -> Result<()> {
    shell.app.sign_out();
    println!("Signed out.");
    Ok(())
}

/// Show the signed-in identity. With the backend unreachable the stored
/// session is kept but not validated; show its last known identity.
pub fn whoami(shell: &Shell) -> Result<()> {
    let session = shell.app.session();
    if let Some(identity) = session.identity() {
        return render::identity(shell, &identity, None);
    }
    match session.stored_identity() {
        Some(identity) => {
            eprintln!("Server unreachable; showing the last signed-in identity.");
            render::identity(shell, &identity, None)
        }
        None => anyhow::bail!("Not signed in. Run `rede login`."),
    }
}
