use crate::core::config::{Config, DisplayMode};
use crate::core::error::GenerationError;
use crate::core::messages::Messages;
use crate::core::state::{Page, Status, StorySegment, WorkflowState};
use crate::services::gemini::{GenerationResult, StoryClient};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(target_arch = "wasm32")]
pub trait ObserverBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> ObserverBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait ObserverBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> ObserverBounds for T {}

/// Receives a fresh snapshot after every state mutation.
pub trait StateObserver: ObserverBounds {
    fn on_change(&self, state: &WorkflowState);
}

impl<F> StateObserver for F
where
    F: Fn(&WorkflowState) + ObserverBounds,
{
    fn on_change(&self, state: &WorkflowState) {
        self(state)
    }
}

/// Drives one story run at a time and owns the book state the UI renders.
#[derive(Clone)]
pub struct WorkflowController {
    client: Arc<dyn StoryClient>,
    state: Arc<Mutex<WorkflowState>>,
    observer: Option<Arc<dyn StateObserver>>,
    running: Arc<AtomicBool>,
    messages: Messages,
    mode: DisplayMode,
    total_pages: usize,
}

/// Clears the in-flight flag however the run ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WorkflowController {
    pub fn new(config: &Config, client: Arc<dyn StoryClient>) -> Self {
        let messages = Messages::new(config.locale);
        let mut state = WorkflowState::new(config.total_pages);
        state.progress_message = messages.writing_story().to_string();

        Self {
            client,
            state: Arc::new(Mutex::new(state)),
            observer: None,
            running: Arc::new(AtomicBool::new(false)),
            messages,
            mode: config.display_mode,
            total_pages: config.total_pages,
        }
    }

    pub fn with_observer(mut self, observer: impl StateObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.lock().clone()
    }

    pub fn advance_page(&self) {
        self.update_if(WorkflowState::advance);
    }

    pub fn retreat_page(&self) {
        self.update_if(WorkflowState::retreat);
    }

    /// Runs a complete generation. Failures are recorded in the state and also
    /// returned. A call made while another run is in flight is rejected with
    /// [`GenerationError::RunInProgress`] and leaves the state untouched.
    pub async fn generate_story(&self) -> GenerationResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Ignoring story request: a run is already in progress");
            return Err(GenerationError::RunInProgress);
        }
        let _guard = RunGuard(self.running.clone());

        log::info!("Starting story run ({} pages, {:?})", self.total_pages, self.mode);
        match self.run_pipeline().await {
            Ok(()) => {
                log::info!("Story run complete");
                Ok(())
            }
            Err(err) => {
                log::error!("Error generating story: {}", err);
                let message = self.messages.run_failed(&err);
                self.update(|state| {
                    state.error_message = message;
                    state.status = Status::Error;
                });
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self) -> GenerationResult<()> {
        let writing = self.messages.writing_story().to_string();
        self.update(|state| {
            *state = WorkflowState::new(self.total_pages);
            state.progress_message = writing;
        });

        let mut segments = self.client.request_segments(self.total_pages).await?;
        segments.sort_by_key(|s| s.page);
        validate_segments(&segments, self.total_pages)?;

        match self.mode {
            DisplayMode::Sequential => self.illustrate_then_publish(&segments).await?,
            DisplayMode::Progressive => self.publish_then_illustrate(&segments).await?,
        }

        let done = self.messages.book_ready().to_string();
        self.update(|state| state.progress_message = done);
        Ok(())
    }

    async fn illustrate_then_publish(&self, segments: &[StorySegment]) -> GenerationResult<()> {
        let mut final_pages = Vec::with_capacity(segments.len());

        for (i, segment) in segments.iter().enumerate() {
            let progress = self.messages.creating_image(i + 1, self.total_pages);
            self.update(|state| state.progress_message = progress);

            let image_url = self.client.request_illustration(&segment.text).await?;
            final_pages.push(Page {
                text: segment.text.clone(),
                image_url,
            });
        }

        self.update(|state| {
            state.pages = final_pages;
            state.current_page_index = 0;
            state.status = Status::Ready;
        });
        Ok(())
    }

    async fn publish_then_illustrate(&self, segments: &[StorySegment]) -> GenerationResult<()> {
        self.update(|state| {
            state.pages = segments.iter().map(Page::from_segment).collect();
            state.current_page_index = 0;
            state.status = Status::Ready;
        });

        for (i, segment) in segments.iter().enumerate() {
            let progress = self.messages.creating_image(i + 1, self.total_pages);
            self.update(|state| {
                if i > 0 {
                    state.status = Status::Generating;
                }
                state.progress_message = progress;
            });

            let image_url = self.client.request_illustration(&segment.text).await?;
            self.update(|state| {
                if let Some(page) = state.pages.get_mut(i) {
                    page.image_url = image_url;
                }
                state.status = Status::Ready;
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut WorkflowState)) {
        self.update_if(|state| {
            f(state);
            true
        });
    }

    /// Applies `f` under the lock, then notifies outside it if `f` changed anything.
    fn update_if(&self, f: impl FnOnce(&mut WorkflowState) -> bool) {
        let snapshot = {
            let mut state = self.lock();
            if !f(&mut *state) {
                return;
            }
            state.clone()
        };
        if let Some(observer) = &self.observer {
            observer.on_change(&snapshot);
        }
    }
}

/// A complete story has exactly `expected` segments numbered `1..=expected`.
/// `segments` must already be sorted by page.
pub fn validate_segments(segments: &[StorySegment], expected: usize) -> GenerationResult<()> {
    if segments.len() != expected {
        return Err(GenerationError::IncompleteStory {
            expected,
            received: segments.len(),
        });
    }
    let numbered = segments
        .iter()
        .enumerate()
        .all(|(i, s)| s.page as usize == i + 1);
    if !numbered {
        return Err(GenerationError::MisnumberedStory { expected });
    }
    Ok(())
}
