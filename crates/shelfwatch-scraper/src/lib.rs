pub mod coordinator;
pub mod driver;
pub mod error;
pub mod extract;
mod html_page;
pub mod navigator;
pub mod page;
mod rate_limit;
pub mod reconcile;
pub mod refresh;
pub mod scrape;

pub use coordinator::{Admission, Coordinator, PendingRun, RefreshPolicy};
pub use driver::{BrowserDriver, BrowserSession, ChromeDriver, HttpDriver};
pub use error::{PageError, RefreshError, ScraperError};
pub use extract::{extract_all, ExtractionResult};
pub use html_page::HtmlPage;
pub use navigator::Navigation;
pub use page::{ElementSnapshot, PageQuery};
pub use reconcile::{apply_detail, reconcile_entity};
pub use refresh::Refresher;
pub use scrape::scrape;
