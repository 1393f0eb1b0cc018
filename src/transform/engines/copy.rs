//! Opaque pass-through. Also the fallback for unmatched assets.

use crate::core::{Asset, Emit};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};

pub struct Copy;

impl Transform for Copy {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["name"])?;
        options.str("name").map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        if let Some(name) = options.str("name")? {
            asset.emit = Emit::File {
                template: Some(name.to_string()),
            };
        }
        Ok(StepOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_keeps_bytes() {
        let mut asset = Asset::new("fonts/a.woff2", vec![0, 159, 146, 150]);
        Copy.apply(&mut asset, &Options::default(), &StepContext::default())
            .unwrap();
        assert_eq!(asset.content, vec![0, 159, 146, 150]);
        assert_eq!(asset.emit, Emit::File { template: None });
    }

    #[test]
    fn test_copy_name_override() {
        let mut options = Options::default();
        options.set("name", "[name].[ext]");
        let mut asset = Asset::new("robots.txt", "User-agent: *");
        Copy.apply(&mut asset, &options, &StepContext::default()).unwrap();
        assert_eq!(
            asset.emit,
            Emit::File {
                template: Some("[name].[ext]".into())
            }
        );
    }
}
