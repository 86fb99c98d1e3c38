use clap::Args;
use serde::Serialize;
use skinrelay_platform::{markers, ActivePlatform, MappingRegistry, PlatformContext, StaticProbe};

use crate::exit_codes;

use super::super::args::GlobalArgs;
use super::output::{emit, Render};
use super::session;

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Server version string, e.g. "git-Paper-196 (MC: 1.20.4)"
    #[arg(long = "version", value_name = "STR")]
    pub server_version: String,

    /// Marker type present on the server: folia, multipaper, paper,
    /// paper-legacy, or a fully qualified class name
    #[arg(long = "marker", value_name = "M")]
    pub markers: Vec<String>,
}

/// Expand the short marker aliases.
fn marker_name(raw: &str) -> &str {
    match raw {
        "folia" => markers::FOLIA,
        "multipaper" => markers::MULTIPAPER,
        "paper" => markers::PAPER,
        "paper-legacy" => markers::PAPER_LEGACY,
        other => other,
    }
}

#[derive(Debug, Serialize)]
struct Detection {
    #[serde(flatten)]
    context: PlatformContext,
    accessors: &'static str,
    profile_member: &'static str,
    profile_shape: &'static str,
    info_style: &'static str,
}

impl Render for Detection {
    fn render(&self) -> String {
        format!(
            "platform:  {}\naccessors: {} ({}, {})\nplayer info: {} packets\n",
            self.context, self.accessors, self.profile_member, self.profile_shape, self.info_style
        )
    }
}

pub fn run(global: &GlobalArgs, args: DetectArgs) -> anyhow::Result<i32> {
    let config = session::load(global)?;
    let probe = args
        .markers
        .iter()
        .fold(StaticProbe::new(args.server_version.clone()), |probe, m| {
            probe.with_marker(marker_name(m))
        });

    let platform = ActivePlatform::initialize(
        &probe,
        &config.platform.allowlist,
        &MappingRegistry::builtin(),
    )?;
    let accessors = platform.adapter().accessors();
    emit(
        global,
        &Detection {
            context: platform.context(),
            accessors: accessors.id,
            profile_member: accessors.profile_member,
            profile_shape: accessors.shape.as_str(),
            info_style: accessors.info_style.as_str(),
        },
    )?;
    Ok(exit_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_expand_to_marker_types() {
        assert_eq!(marker_name("folia"), markers::FOLIA);
        assert_eq!(marker_name("paper-legacy"), markers::PAPER_LEGACY);
        assert_eq!(marker_name("com.example.Custom"), "com.example.Custom");
    }
}
