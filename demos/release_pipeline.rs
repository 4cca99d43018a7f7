//! A package-release pipeline
//!
//! Packs the current directory into a tarball inside `build_root`, records
//! the tarball as a build artifact, and checks it in `after_build`.
//!
//! ```text
//! PHASELINE_FLAG_PACKAGE=demo PHASELINE_FLAG_VERSION=0.1.0 \
//!     cargo run --example release_pipeline
//! ```

use anyhow::Context;
use phaseline::{
    register_capability, CapabilityModule, Catalog, LoggingHandler, Phase, PipelineOptions,
    Result, Severity, StepContext,
};
use serde_json::{json, Value};
use std::process::Command;
use std::sync::Arc;

/// Runs `command` through `sh -c`, failing the build on a non-zero exit
fn sh(ctx: &StepContext<'_>, command: &str) -> Result<()> {
    ctx.log(Severity::Debug, &format!("$ {}", command));
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("failed to spawn `{}`", command))?;

    if !status.success() {
        return ctx.fail_build(format!("`{}` exited with {}", command, status));
    }
    Ok(())
}

fn register_common() {
    register_capability(
        CapabilityModule::new("Checksums")
            .instance_operation("checksum", |ctx, args| {
                let path = args.first().and_then(Value::as_str).unwrap_or_default();
                let output = Command::new("cksum")
                    .arg(path)
                    .output()
                    .context("failed to run cksum")?;
                let sum = String::from_utf8_lossy(&output.stdout)
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                ctx.push_artifact("checksum", sum.clone());
                Ok(json!(sum))
            })
            .on_attach(|ty| {
                ty.log(Severity::Info, "checksums enabled");
                Ok(())
            }),
    );
}

fn main() -> anyhow::Result<()> {
    phaseline::init_from_env();
    register_common();

    let build_root = tempfile::TempDir::new()?;

    let mut catalog = Catalog::new();
    catalog
        .define("Release")?
        .expect_flags(["package", "version"])
        .include(["Checksums"])
        .set_log_level(Severity::Debug)
        .phase(Phase::Setup, |ctx| {
            let package = ctx.require_flag("package", "package name is required")?.clone();
            ctx.log(Severity::Info, &format!("releasing {}", package));
            Ok(())
        })
        .phase(Phase::Build, |ctx| {
            let package = ctx.flag_str("package").unwrap_or_default();
            let version = ctx.flag_str("version").unwrap_or_default();
            let tarball = format!("{}-{}.tar.gz", package, version);
            let source = ctx.esc_flag("source").unwrap_or_else(|| ctx.esc("."));

            sh(
                ctx,
                &format!(
                    "tar -czf {} -C {} --exclude target --exclude .git .",
                    ctx.esc(&tarball),
                    source
                ),
            )?;
            ctx.push_artifact("tarball", tarball);
            Ok(())
        })
        .phase(Phase::AfterBuild, |ctx| {
            let tarball = ctx
                .require_artifact(Phase::Build, "tarball", "build produced no tarball")?
                .clone();
            ctx.call("checksum", &[tarball])?;
            sh(ctx, "ls -l *.tar.gz")
        })
        .phase(Phase::Teardown, |ctx| {
            let checksum = ctx.artifact(Phase::AfterBuild, "checksum").cloned();
            ctx.log(
                Severity::Info,
                &format!("release complete, checksum {}", checksum.unwrap_or_default()),
            );
            Ok(())
        });

    let source = std::env::current_dir()?;
    let options = PipelineOptions::new()
        .with_flag("package", "demo")
        .with_flag("version", "0.1.0")
        .with_flag("source", source.to_string_lossy().to_string())
        .with_flag("build_root", build_root.path().to_string_lossy().to_string())
        .with_progress_handler(Arc::new(LoggingHandler));

    let mut release = catalog.instantiate("Release", options)?;
    release.run()?;

    println!("{}", serde_json::to_string_pretty(release.all_artifacts())?);
    Ok(())
}
