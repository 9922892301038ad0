//! Default values for configuration

/// Default public base URL of the deployment that serves screenshot assets
pub fn default_site_base_url() -> String {
    std::env::var("TRENDI_SITE_URL")
        .unwrap_or_else(|_| "https://trenditools.example.com".to_string())
}

/// Default per-field fetch cap for the search aggregator
///
/// Each of the three field searches (name, descriptor, tags) is capped here,
/// so at most 3x this many distinct tools are reachable for one query string.
pub fn default_search_fetch_cap() -> usize {
    20
}

/// Default page size for search results
pub fn default_search_page_size() -> usize {
    12
}

/// Default number of featured tools returned
pub fn default_featured_limit() -> usize {
    6
}

/// Default extraction API base URL
pub fn default_extract_api_base() -> String {
    "https://api.firecrawl.dev/v1".to_string()
}

/// Default environment variable name for the extraction API key
pub fn default_extract_api_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}

/// Default poll interval for extraction jobs (2 seconds)
pub fn default_extract_poll_interval_ms() -> u64 {
    2000
}

/// Default maximum poll attempts before an extraction job times out
pub fn default_extract_max_poll_attempts() -> u32 {
    30
}

/// Default screenshot viewport width
pub fn default_capture_viewport_width() -> u32 {
    1200
}

/// Default screenshot viewport height
pub fn default_capture_viewport_height() -> u32 {
    800
}

/// Default page navigation timeout (30 seconds)
pub fn default_capture_nav_timeout_ms() -> u64 {
    30000
}

/// Default wait after load for client-rendered content (2 seconds)
pub fn default_capture_settle_ms() -> u64 {
    2000
}

/// Default object storage API base URL
pub fn default_storage_base_url() -> String {
    std::env::var("TRENDI_STORAGE_URL")
        .unwrap_or_else(|_| "https://trenditools.example.com".to_string())
}

/// Default pipeline batch size
pub fn default_pipeline_batch_size() -> usize {
    3
}

/// Default delay between individual requests (2 seconds)
pub fn default_pipeline_request_delay_ms() -> u64 {
    2000
}

/// Default delay between batches (5 seconds)
pub fn default_pipeline_batch_delay_ms() -> u64 {
    5000
}

/// Default maximum attempts per URL
pub fn default_pipeline_max_retries() -> u32 {
    3
}

/// Default checkpoint interval (save progress every N processed items)
pub fn default_pipeline_checkpoint_interval() -> usize {
    5
}

/// Default assistant chat-completions base URL
pub fn default_chat_api_base() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// Default environment variable name for the assistant API key
pub fn default_chat_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default assistant model
pub fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default number of tools recommended per chat turn
pub fn default_chat_recommendation_limit() -> usize {
    5
}
