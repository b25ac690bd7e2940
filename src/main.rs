#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use anyhow::Result;
    use indicatif::{ProgressBar, ProgressStyle};
    use inquire::Select;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use storybook::core::config::Config;
    use storybook::core::state::{Status, WorkflowState};
    use storybook::services::gemini::GeminiClient;
    use storybook::services::workflow::WorkflowController;

    const NEXT: &str = "Next page";
    const PREVIOUS: &str = "Previous page";
    const RESTART: &str = "New story";
    const QUIT: &str = "Quit";

    pub async fn run() -> Result<()> {
        let config = Config::load()?;

        // A missing credential stops the process before any run is attempted.
        let client = Arc::new(GeminiClient::new(&config)?);

        let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
        let spinner_for_observer = spinner.clone();

        let controller = WorkflowController::new(&config, client).with_observer(
            move |state: &WorkflowState| {
                if let Ok(guard) = spinner_for_observer.lock() {
                    if let Some(pb) = guard.as_ref() {
                        pb.set_message(state.progress_message.clone());
                    }
                }
            },
        );

        loop {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(120));
            set_spinner(&spinner, Some(pb.clone()));

            let outcome = controller.generate_story().await;

            set_spinner(&spinner, None);
            pb.finish_and_clear();

            let state = controller.snapshot();
            if outcome.is_err() || state.status == Status::Error {
                println!("{}", state.error_message);
                match Select::new("What next?", vec![RESTART, QUIT]).prompt() {
                    Ok(RESTART) => continue,
                    _ => break,
                }
            }

            println!("{}", state.progress_message);
            if !browse(&controller)? {
                break;
            }
        }

        Ok(())
    }

    fn set_spinner(slot: &Mutex<Option<ProgressBar>>, pb: Option<ProgressBar>) {
        if let Ok(mut guard) = slot.lock() {
            *guard = pb;
        }
    }

    /// Page through the finished book. Returns true when a new story is requested.
    fn browse(controller: &WorkflowController) -> Result<bool> {
        loop {
            let state = controller.snapshot();
            render_page(&state);

            let mut options = Vec::new();
            if !state.is_last_page() {
                options.push(NEXT);
            }
            if !state.is_first_page() {
                options.push(PREVIOUS);
            }
            options.push(RESTART);
            options.push(QUIT);

            match Select::new("Navigate:", options).prompt() {
                Ok(NEXT) => controller.advance_page(),
                Ok(PREVIOUS) => controller.retreat_page(),
                Ok(RESTART) => return Ok(true),
                Ok(_) => return Ok(false),
                Err(_) => {
                    println!("Error reading input, stopping.");
                    return Ok(false);
                }
            }
        }
    }

    fn render_page(state: &WorkflowState) {
        let Some(page) = state.current_page() else {
            return;
        };
        println!();
        println!("--- Page {} of {} ---", state.current_page_index + 1, state.pages.len());
        println!("{}", page.text);
        if page.has_image() {
            // Data URIs are far too long for a terminal; show only the media type.
            let kind = page
                .image_url
                .split_once(';')
                .map(|(head, _)| head.trim_start_matches("data:"))
                .unwrap_or("image");
            println!("[illustration: {}, {} bytes]", kind, page.image_url.len());
        }
        println!();
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
