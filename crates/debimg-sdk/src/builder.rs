//! Fluent API for configuring a [`Converter`].

use debimg_common::config::{ConvertConfig, PackerKind};
use debimg_common::error::Result;
use debimg_common::process::require_tool;
use debimg_image::pack::{ImagePacker, packer_for};
use debimg_resolve::apt::AptFetcher;
use debimg_resolve::fetcher::PackageFetcher;

use crate::converter::Converter;

/// Builder for a [`Converter`].
///
/// Without explicit collaborators the converter fetches with
/// `apt-get`/`dpkg-deb` and packs with whatever `config.packer` selects.
/// The external tools those defaults need are looked up on `PATH` when
/// [`build`](Self::build) runs.
pub struct ConverterBuilder {
    config: ConvertConfig,
    fetcher: Option<Box<dyn PackageFetcher>>,
    packer: Option<Box<dyn ImagePacker>>,
}

impl ConverterBuilder {
    /// Starts from the given configuration.
    #[must_use]
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            fetcher: None,
            packer: None,
        }
    }

    /// Uses a custom package fetcher instead of `apt-get`.
    #[must_use]
    pub fn fetcher(mut self, fetcher: impl PackageFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Uses a custom image packer instead of the configured one.
    #[must_use]
    pub fn packer(mut self, packer: impl ImagePacker + 'static) -> Self {
        self.packer = Some(Box::new(packer));
        self
    }

    /// Validates the configuration and assembles the converter.
    ///
    /// # Errors
    ///
    /// Returns `DebimgError::Config` if the configuration is invalid or a
    /// required external tool cannot be found.
    pub fn build(self) -> Result<Converter> {
        self.config.validate()?;

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let _ = require_tool(&self.config.tools.apt_get)?;
                let _ = require_tool(&self.config.tools.dpkg_deb)?;
                Box::new(AptFetcher::from_tools(&self.config.tools))
            }
        };
        let packer = match self.packer {
            Some(packer) => packer,
            None => {
                if self.config.packer == PackerKind::Actool {
                    let _ = require_tool(&self.config.tools.actool)?;
                }
                packer_for(&self.config)
            }
        };

        tracing::debug!(
            work_root = %self.config.work_root.display(),
            packer = %self.config.packer,
            "converter configured"
        );
        Ok(Converter::new(self.config, fetcher, packer))
    }
}

impl std::fmt::Debug for ConverterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterBuilder")
            .field("config", &self.config)
            .field("custom_fetcher", &self.fetcher.is_some())
            .field("custom_packer", &self.packer.is_some())
            .finish()
    }
}
