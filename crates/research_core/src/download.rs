/// Route the service serves generated files from.
pub const DOWNLOAD_ROUTE: &str = "/api/download/";

/// Filename sent with a start request when the user does not pick one.
pub const DEFAULT_OUTPUT_FILENAME: &str = "research_paper.pdf";

/// Build the link for a generated file: `{api_base}/api/download/{filename}`.
///
/// An empty base yields a path relative to whatever origin the link is
/// resolved against. The file's existence is not checked.
pub fn download_reference(api_base: &str, filename: &str) -> String {
    format!(
        "{}{}{}",
        api_base.trim_end_matches('/'),
        DOWNLOAD_ROUTE,
        filename
    )
}
