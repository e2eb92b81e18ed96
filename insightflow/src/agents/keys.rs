//! Context keys of the analysis pipeline.

/// Path of the dataset to analyze. Run input.
pub const DATA_PATH: &str = "data_path";
/// The dataset as loaded.
pub const RAW_DF: &str = "raw_df";
/// Text profile of the raw dataset.
pub const PROFILE_REPORT: &str = "profile_report";
/// The cleaned dataset.
pub const CLEANED_DF: &str = "cleaned_df";
/// Generated internal insights.
pub const INTERNAL_INSIGHTS: &str = "internal_insights";
/// Grounded external market context.
pub const EXTERNAL_CONTEXT: &str = "external_context";
/// Chart artifacts.
pub const PLOT_PATHS: &str = "plot_paths";
/// Predictive analysis report.
pub const ML_REPORTS: &str = "ml_reports";
/// Strategic recommendations.
pub const RECOMMENDATION_REPORT: &str = "recommendation_report";
/// Status stamped on the final report.
pub const FINAL_REPORT_STATUS: &str = crate::pipeline::keys::REPORT_STATUS;
/// Full text of the final report.
pub const FINAL_REPORT_CONTENT: &str = "final_report_content";
/// Where the final report was written.
pub const FINAL_REPORT_PATH: &str = crate::pipeline::keys::REPORT_PATH;
