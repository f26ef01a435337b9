mod pagespeed;
mod quota;
mod scanner;
mod storage;

pub use pagespeed::{PageSpeedClient, Strategy};
pub use quota::{LocalQuota, QuotaService, QuotaStatus, RemoteQuota};
pub use scanner::{parse_page_url, score_page, PageExtractor, Scanner};
pub use storage::{HttpObjectStore, LocalObjectStore, ObjectStore};
