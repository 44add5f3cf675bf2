// Stem separation abstraction
//
// The separator splits a mixed track into vocals and everything else. Where
// the external tool leaves its files, and how to find them again, is the
// implementation's business; callers only see the resolved stem paths.

pub mod demucs;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use demucs::*;

use crate::config::SeparatorConfig;
use crate::error::Result;

/// Stem files produced by one separation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    /// Everything except vocals
    pub no_vocals: PathBuf,
    /// Isolated vocals, when the separator kept them
    pub vocals: Option<PathBuf>,
}

/// Two-stem source separation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Separator: Send + Sync {
    /// Split `input` into vocals and no-vocals stems.
    ///
    /// Fails with `SeparationFailed` when no usable no-vocals stem can be found.
    async fn separate(&self, input: &Path) -> Result<StemPaths>;
}

/// Factory for creating separator instances
pub struct SeparatorFactory;

impl SeparatorFactory {
    /// Create the default separator implementation (demucs)
    pub fn create_separator(config: SeparatorConfig) -> Box<dyn Separator> {
        Box::new(demucs::DemucsSeparator::new(config))
    }
}
