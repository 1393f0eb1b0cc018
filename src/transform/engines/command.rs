//! Pipe asset content through an external program.
//!
//! ```toml
//! [[rules]]
//! test = '\.less$'
//! use = [{ engine = "command", options = { program = "lessc", args = ["-"], extension = "css" } }, "style"]
//! ```
//!
//! Content goes to stdin, stdout becomes the new content. `$KILN_ASSET`,
//! `$KILN_SOURCE` and `$KILN_ROOT` are set in the environment and expanded
//! in `args`.

use rustc_hash::FxHashMap;
use std::io::{Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::core::{Asset, AssetKind};
use crate::transform::{
    FailurePolicy, OptionError, Options, StepContext, StepError, StepOutput, Transform,
};

pub struct Command;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn kiln_vars(asset: &Asset, cx: &StepContext) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();
    vars.insert("KILN_ASSET".into(), asset.id.clone());
    vars.insert(
        "KILN_SOURCE".into(),
        cx.source_root.join(&asset.id).display().to_string(),
    );
    vars.insert("KILN_ROOT".into(), cx.source_root.display().to_string());
    vars
}

/// Replace `$KILN_*` occurrences in `args`.
fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                result = result.replace(&format!("${key}"), value);
            }
            result
        })
        .collect()
}

/// Wait for `child`, killing it once `timeout` elapses.
fn wait_with_deadline(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, StepError> {
    let Some(timeout) = timeout else {
        return Ok(child.wait()?);
    };
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            child.kill().ok();
            child.wait().ok();
            return Err(StepError::Timeout(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn run(
    program: &str,
    args: &[String],
    input: &[u8],
    vars: &FxHashMap<String, String>,
    cx: &StepContext,
) -> Result<(Vec<u8>, Vec<u8>), StepError> {
    let fail = |message: String| StepError::Command {
        program: program.to_string(),
        message,
    };
    let path = which::which(program).map_err(|e| fail(format!("not found: {e}")))?;

    let mut child = std::process::Command::new(path)
        .args(args)
        .envs(vars)
        .current_dir(&cx.source_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| fail(format!("failed to start: {e}")))?;

    let (mut stdin, mut stdout, mut stderr) = (child.stdin.take(), child.stdout.take(), child.stderr.take());

    let (status, out, err) = std::thread::scope(|s| {
        s.spawn(move || {
            if let Some(stdin) = stdin.as_mut() {
                // Broken pipe is fine: the program may not read its input.
                stdin.write_all(input).ok();
            }
            drop(stdin);
        });
        let out = s.spawn(move || {
            let mut buf = Vec::new();
            if let Some(stdout) = stdout.as_mut() {
                stdout.read_to_end(&mut buf).ok();
            }
            buf
        });
        let err = s.spawn(move || {
            let mut buf = Vec::new();
            if let Some(stderr) = stderr.as_mut() {
                stderr.read_to_end(&mut buf).ok();
            }
            buf
        });
        let status = wait_with_deadline(&mut child, cx.timeout);
        (
            status,
            out.join().unwrap_or_default(),
            err.join().unwrap_or_default(),
        )
    });

    let status = status?;
    if !status.success() {
        let stderr = String::from_utf8_lossy(&err);
        let detail = stderr.trim();
        return Err(fail(if detail.is_empty() {
            format!("exited with {status}")
        } else {
            format!("exited with {status}: {detail}")
        }));
    }
    Ok((out, err))
}

impl Transform for Command {
    fn policy(&self, options: &Options) -> FailurePolicy {
        match options.bool("advisory") {
            Ok(Some(true)) => FailurePolicy::Advisory,
            _ => FailurePolicy::Required,
        }
    }

    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["program", "args", "advisory", "extension"])?;
        match options.str("program")? {
            Some(p) if !p.trim().is_empty() => {}
            _ => return Err(OptionError::new("program", "is required")),
        }
        options.str_list("args")?;
        options.bool("advisory")?;
        options.str("extension").map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let program = options
            .str("program")?
            .ok_or_else(|| OptionError::new("program", "is required"))?;
        let vars = kiln_vars(asset, cx);
        let args = resolve_args(&options.str_list("args")?.unwrap_or_default(), &vars);

        let advisory = self.policy(options) == FailurePolicy::Advisory;
        let (output, stderr) = run(program, &args, &asset.content, &vars, cx)?;

        // Advisory programs are checkers: their output is not the new content.
        if !advisory {
            asset.content = output;
            if let Some(ext) = options.str("extension")? {
                asset.extension = ext.to_ascii_lowercase();
                asset.kind = AssetKind::from_extension(ext);
            }
        }

        let stderr = String::from_utf8_lossy(&stderr);
        let note = stderr.trim();
        let step = StepOutput::default();
        Ok(if note.is_empty() {
            step
        } else {
            step.with_diagnostic(format!("{program}: {note}"))
        })
    }
}
