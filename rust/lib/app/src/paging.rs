//! Page-cursor list loading.
//!
//! Pages are 1-based and fixed-size. A page shorter than the page size
//! ends the list. Items are kept in server order with no re-sorting or
//! de-duplication, so a page boundary can shift when new items are created
//! between requests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rede_client::ApiError;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AppError;

/// Where pages come from.
#[async_trait]
pub trait PageSource<T: Send + 'static>: Send + Sync + 'static {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Vec<T>, ApiError>;
}

/// Snapshot of the loader's position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    /// Last page successfully loaded; 0 before the first load.
    pub page: u32,
    pub has_more: bool,
    pub loading_more: bool,
    pub refreshing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was applied; carries the number of items it held.
    Loaded(usize),
    /// Nothing was requested (no more pages, or a load already running).
    Skipped,
    /// The page arrived after a newer refresh started and was dropped.
    Stale,
}

struct LoaderState<T> {
    items: Vec<T>,
    cursor: Cursor,
    loaded: bool,
    generation: u64,
}

#[derive(Clone, Copy)]
enum Load {
    Initial,
    More,
}

/// Clears a load's in-flight flag if the load is dropped before its page
/// arrives.
struct InFlight<'a, T> {
    state: &'a Mutex<LoaderState<T>>,
    load: Load,
    generation: u64,
    armed: bool,
}

impl<'a, T> InFlight<'a, T> {
    fn new(state: &'a Mutex<LoaderState<T>>, load: Load, generation: u64) -> Self {
        Self {
            state,
            load,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match self.load {
            // A newer initial load owns the flag now.
            Load::Initial if st.generation != self.generation => {}
            Load::Initial => st.cursor.refreshing = false,
            Load::More => st.cursor.loading_more = false,
        }
        debug!(generation = self.generation, "load abandoned");
    }
}

pub struct PageLoader<T: Send + 'static, S: PageSource<T>> {
    source: S,
    page_size: u32,
    state: Mutex<LoaderState<T>>,
}

impl<T, S> PageLoader<T, S>
where
    T: Clone + Send + 'static,
    S: PageSource<T>,
{
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            state: Mutex::new(LoaderState {
                items: Vec::new(),
                cursor: Cursor::default(),
                loaded: false,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.lock().cursor
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Fetch page 1 and replace the list with it.
    ///
    /// On failure the current items and cursor are kept. If another
    /// initial load starts before this one returns, this result is
    /// dropped. Cancelling the returned future leaves the list as it was.
    pub async fn load_initial(&self) -> Result<LoadOutcome, AppError> {
        let generation = {
            let mut st = self.lock();
            st.generation += 1;
            st.cursor.refreshing = true;
            st.generation
        };

        let in_flight = InFlight::new(&self.state, Load::Initial, generation);
        let result = self.source.fetch_page(1, self.page_size).await;
        in_flight.disarm();

        let mut st = self.lock();
        if st.generation != generation {
            debug!(generation, "initial page superseded");
            return Ok(LoadOutcome::Stale);
        }
        st.cursor.refreshing = false;
        match result {
            Ok(items) => {
                let n = items.len();
                st.items = items;
                st.cursor.page = 1;
                st.cursor.has_more = n == self.page_size as usize;
                st.loaded = true;
                debug!(n, has_more = st.cursor.has_more, "loaded page 1");
                Ok(LoadOutcome::Loaded(n))
            }
            Err(e) => {
                warn!("initial page failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Fetch the next page and append it.
    ///
    /// No request is made when the list is exhausted, has not been loaded
    /// yet, or a load is already running. A failure keeps the cursor where
    /// it was so the same page is requested again next time.
    pub async fn load_more(&self) -> Result<LoadOutcome, AppError> {
        let (page, generation) = {
            let mut st = self.lock();
            let c = st.cursor;
            if !st.loaded || !c.has_more || c.loading_more || c.refreshing {
                return Ok(LoadOutcome::Skipped);
            }
            st.cursor.loading_more = true;
            (c.page + 1, st.generation)
        };

        let in_flight = InFlight::new(&self.state, Load::More, generation);
        let result = self.source.fetch_page(page, self.page_size).await;
        in_flight.disarm();

        let mut st = self.lock();
        st.cursor.loading_more = false;
        if st.generation != generation {
            debug!(page, "page arrived after refresh, dropped");
            return Ok(LoadOutcome::Stale);
        }
        match result {
            Ok(items) => {
                let n = items.len();
                st.items.extend(items);
                st.cursor.page = page;
                st.cursor.has_more = n == self.page_size as usize;
                debug!(page, n, has_more = st.cursor.has_more, "appended page");
                Ok(LoadOutcome::Loaded(n))
            }
            Err(e) => {
                warn!(page, "page failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Reload from page 1. Scroll position is the caller's concern.
    pub async fn refresh(&self) -> Result<LoadOutcome, AppError> {
        self.load_initial().await
    }

    /// Apply `f` to every loaded item.
    pub fn update_items(&self, f: impl FnMut(&mut T)) {
        self.lock().items.iter_mut().for_each(f);
    }
}
