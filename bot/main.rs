//! Chat moderation bot.
//!
//! Speaks line-delimited JSON with a gateway process over stdin/stdout (see
//! `bridge`). Every inbound message runs through `optic::moderation::Moderator`
//! and the resulting deletes and warnings are written back as operations.
//!
//! Requires `DISCORD_TOKEN`; the remaining settings are shared with the
//! server (`optic::Config`).

mod bridge;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};

use optic::config::discord_token;
use optic::moderation::{Moderator, TesseractOcr};
use optic::{classifier, Config, ImagePipeline, KeywordList};

use bridge::{HttpAttachments, LinePlatform};

fn main() -> Result<()> {
    optic::logging::init();

    let token = match discord_token() {
        Ok(t) => t,
        Err(e) => {
            log::error!("{}", e);
            return Err(e.into());
        }
    };
    let config = Config::from_env()?;

    let keywords = KeywordList::load_or_builtin(config.keywords_path.as_deref())
        .context("loading banned keyword list")?;
    log::info!("{} banned keywords active", keywords.len());

    let model = Arc::new(classifier::from_config(&config));
    {
        let model = model.clone();
        std::thread::spawn(move || model.warm());
    }

    let attachments = HttpAttachments::new(config.download_timeout)
        .context("building HTTP client")?;
    let mut moderator = Moderator::new(
        ImagePipeline::new(model),
        keywords,
        Box::new(TesseractOcr::new(&config.tesseract_bin)),
        Box::new(attachments),
    );
    if let Some(dir) = &config.scratch_dir {
        moderator = moderator.with_scratch_dir(dir);
    }

    let mut platform = LinePlatform::new(io::stdout().lock());
    platform.identify(&token).context("writing identify")?;

    bridge::run(io::stdin().lock(), &mut moderator, &mut platform);
    log::info!("Gateway closed, shutting down");
    Ok(())
}
