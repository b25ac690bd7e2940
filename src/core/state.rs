use serde::{Deserialize, Serialize};

/// One page worth of narrative text, as returned by the text model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StorySegment {
    pub page: u32,
    pub text: String,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    /// Empty until the illustration for this page arrives.
    pub image_url: String,
}

impl Page {
    pub fn from_segment(segment: &StorySegment) -> Self {
        Self {
            text: segment.text.clone(),
            image_url: String::new(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    #[default]
    Generating,
    Ready,
    Error,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct WorkflowState {
    pub status: Status,
    pub progress_message: String,
    pub error_message: String,
    pub pages: Vec<Page>,
    pub current_page_index: usize,
    pub total_pages: usize,
}

impl WorkflowState {
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            ..Default::default()
        }
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current_page_index)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page_index == 0
    }

    pub fn is_last_page(&self) -> bool {
        !self.pages.is_empty() && self.current_page_index == self.pages.len() - 1
    }

    /// Number of pages whose illustration has already been filled in.
    pub fn images_ready(&self) -> usize {
        self.pages.iter().filter(|p| p.has_image()).count()
    }

    pub(crate) fn advance(&mut self) -> bool {
        if self.pages.is_empty() || self.is_last_page() {
            return false;
        }
        self.current_page_index += 1;
        true
    }

    pub(crate) fn retreat(&mut self) -> bool {
        if self.is_first_page() {
            return false;
        }
        self.current_page_index -= 1;
        true
    }
}
