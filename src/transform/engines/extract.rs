//! Hand a compiled stylesheet to the consolidation hook instead of writing it.

use crate::core::{Asset, AssetKind, Emit};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};

pub struct Extract;

impl Transform for Extract {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&[])
    }

    fn apply(
        &self,
        asset: &mut Asset,
        _options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        if asset.kind != AssetKind::Style {
            return Err(StepError::Rejected(format!(
                "cannot extract a {} asset, run a style step first",
                asset.kind.label()
            )));
        }
        asset.emit = Emit::Extracted;
        Ok(StepOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_marks_style() {
        let mut asset = Asset::new("a.css", "a{}");
        Extract
            .apply(&mut asset, &Options::default(), &StepContext::default())
            .unwrap();
        assert_eq!(asset.emit, Emit::Extracted);
    }

    #[test]
    fn test_extract_rejects_script() {
        let mut asset = Asset::new("a.js", "1");
        assert!(
            Extract
                .apply(&mut asset, &Options::default(), &StepContext::default())
                .is_err()
        );
        assert_eq!(asset.emit, Emit::File { template: None });
    }
}
