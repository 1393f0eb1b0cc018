//! One asset's trip through its step chain.

use crossbeam::channel;
use std::sync::Arc;

use super::Issue;
use crate::core::{Asset, BuildContext, Emit, SideAsset};
use crate::logger::ProgressLine;
use crate::transform::{
    FailurePolicy, StepContext, StepDescriptor, StepError, StepOutput, Transform,
};

/// `Discovered → Matching → Transforming(i) → Transformed | Failed | Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Discovered,
    Matching,
    Transforming(usize),
    Transformed,
    Failed,
    Cancelled,
}

impl AssetState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Transformed | Self::Failed | Self::Cancelled)
    }
}

pub(super) struct AssetRun {
    pub asset: Asset,
    pub state: AssetState,
    pub side_assets: Vec<SideAsset>,
    pub warnings: Vec<Issue>,
    pub failure: Option<Issue>,
}

impl AssetRun {
    fn new(asset: Asset) -> Self {
        Self {
            asset,
            state: AssetState::Discovered,
            side_assets: Vec::new(),
            warnings: Vec::new(),
            failure: None,
        }
    }

    fn advance(&mut self, next: AssetState) {
        debug_assert!(!self.state.is_terminal(), "{} already finished", self.asset.id);
        crate::debug!("pipeline"; "{}: {:?} -> {:?}", self.asset.id, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, step: Option<&str>, message: String) {
        self.failure = Some(Issue::new(&self.asset.id, step, message));
        self.advance(AssetState::Failed);
    }
}

/// Apply one step, on a watchdog thread when a timeout is set.
fn apply_step(
    engine: &Arc<dyn Transform>,
    asset: &mut Asset,
    step: &StepDescriptor,
    scx: &StepContext,
) -> Result<StepOutput, StepError> {
    let Some(timeout) = scx.timeout else {
        return engine.apply(asset, &step.options, scx);
    };

    let (tx, rx) = channel::bounded(1);
    let engine = Arc::clone(engine);
    let mut work = asset.clone();
    let options = step.options.clone();
    let thread_cx = scx.clone();
    std::thread::spawn(move || {
        let result = engine.apply(&mut work, &options, &thread_cx);
        tx.send((work, result)).ok();
    });

    match rx.recv_timeout(timeout) {
        Ok((work, result)) => {
            if result.is_ok() {
                *asset = work;
            }
            result
        }
        Err(_) => Err(StepError::Timeout(timeout)),
    }
}

/// Resolve and run `asset`'s chain.
pub(super) fn run_asset(cx: &BuildContext, asset: Asset, progress: Option<&ProgressLine>) -> AssetRun {
    let label = asset.kind.label();
    let mut run = AssetRun::new(asset);
    let scx = cx.step_context();

    run.advance(AssetState::Matching);
    let resolution = cx.rules.resolve(&run.asset.id);
    run.asset.precedence = resolution.precedence;
    if resolution.filename.is_some() {
        run.asset.emit = Emit::File {
            template: resolution.filename.clone(),
        };
    }

    for (i, step) in resolution.steps.iter().enumerate() {
        if cx.is_cancelled() {
            run.advance(AssetState::Cancelled);
            break;
        }
        run.advance(AssetState::Transforming(i));

        // Engines are checked at compile time; a miss means the registry changed.
        let Some(engine) = cx.registry.get(&step.engine) else {
            run.fail(Some(&step.engine), "engine is not registered".into());
            break;
        };

        match apply_step(engine, &mut run.asset, step, &scx) {
            Ok(output) => {
                run.side_assets.extend(output.side_assets);
                for message in output.diagnostics {
                    run.warnings
                        .push(Issue::new(&run.asset.id, Some(&step.engine), message));
                }
            }
            Err(e) => {
                let advisory = engine.policy(&step.options) == FailurePolicy::Advisory;
                if advisory && !step.strict && !scx.strict {
                    run.warnings
                        .push(Issue::new(&run.asset.id, Some(&step.engine), e.to_string()));
                } else {
                    run.fail(Some(&step.engine), e.to_string());
                    break;
                }
            }
        }
    }

    if !run.state.is_terminal() {
        run.advance(AssetState::Transformed);
        cx.manifest()
            .register(&run.asset.id, run.asset.kind, run.asset.parent.as_deref());
    }
    if run.state != AssetState::Transformed {
        run.side_assets.clear();
    }
    if let Some(progress) = progress {
        progress.inc(label);
    }
    run
}
