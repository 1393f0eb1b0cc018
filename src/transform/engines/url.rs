//! Inline small files as `data:` URIs, emit the rest as named files.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::core::{Asset, Emit};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};
use crate::utils::mime;

pub struct Url;

const DEFAULT_NAME: &str = "[name]-[hash:10].[ext]";

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime_type: &str, content: &[u8]) -> String {
    format!("data:{};base64,{}", mime::essence(mime_type), STANDARD.encode(content))
}

impl Transform for Url {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["limit", "name", "mimetype"])?;
        options.u64("limit")?;
        options.str("name")?;
        options.str("mimetype").map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let limit = options.u64("limit")?.unwrap_or(cx.inline_limit);
        if asset.size() <= limit {
            let mime_type = match options.str("mimetype")? {
                Some(m) => m,
                None => mime::from_extension(Some(&asset.extension)),
            };
            asset.emit = Emit::Inline { size: asset.size() };
            asset.content = data_uri(mime_type, &asset.content).into_bytes();
        } else {
            let name = options.str("name")?.unwrap_or(DEFAULT_NAME);
            asset.emit = Emit::File {
                template: Some(name.to_string()),
            };
        }
        Ok(StepOutput::default())
    }
}
