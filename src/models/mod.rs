use crate::error::{AppError, Result};

mod content_plan;
mod report;
mod scan;

pub use content_plan::{ContentPlan, ContentPlanItem, ItemStatus, NewContentPlan, SearchIntent};
pub use report::{NewReport, Report, ReportKind, ReportType};
pub use scan::{
    AiAnalysis, Headings, ImageInfo, NewScan, Performance, PerformanceMetrics, Scan, ScanPayload,
    SeoData,
};

/// Owner ids are the first segment of every storage path, so they must be a
/// single plain segment.
pub fn validate_user_id(user_id: &str) -> Result<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    if user_id == "."
        || user_id == ".."
        || user_id.contains(['/', '\\'])
        || user_id.chars().any(char::is_control)
    {
        return Err(AppError::Validation(format!("invalid user_id '{}'", user_id)));
    }
    Ok(user_id)
}

/// Gated features tracked by the quota service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Pdf,
    Ai,
    Scan,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Pdf => "pdf",
            Feature::Ai => "ai",
            Feature::Scan => "scan",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_must_be_a_single_segment() {
        assert_eq!(validate_user_id("  u1 ").unwrap(), "u1");
        assert_eq!(validate_user_id("user.name@example.com").unwrap(), "user.name@example.com");
        for bad in ["", "   ", ".", "..", "../other-bucket", "alice/../bob", "a\\b", "a\nb"] {
            assert!(
                matches!(validate_user_id(bad), Err(AppError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
