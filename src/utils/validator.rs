use anyhow::Result;

use crate::core::http::ResourceLocator;

/// Plain-HTTP URL with an optional scheme.
pub fn is_valid_url(url: &str) -> bool {
    ResourceLocator::parse(url).is_ok()
}

pub fn validate_worker_count(workers: usize) -> Result<()> {
    if workers == 0 {
        anyhow::bail!("worker count must be greater than 0");
    }
    Ok(())
}

pub fn validate_budget(name: &str, bytes: usize) -> Result<()> {
    if bytes == 0 {
        anyhow::bail!("{} must be greater than 0", name);
    }
    Ok(())
}

pub fn validate_output_dir(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        anyhow::bail!("output directory must not be empty");
    }
    Ok(())
}
