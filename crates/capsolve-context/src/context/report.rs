use std::fmt;

use capsolve_core::display_version;

use super::init::Initialized;
use crate::ee::ExecutionEnvironment;

/// What initialization settled on, for `debug_level` logging and the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub ee: ExecutionEnvironment,
    pub repositories: Vec<String>,
    pub framework: Option<String>,
    pub framework_capabilities: usize,
    pub input_requirements: Vec<String>,
    pub effective: Vec<String>,
    pub blacklisted: Vec<String>,
}

impl InitReport {
    pub(crate) fn from_state(state: &Initialized) -> Self {
        let framework = state.framework_resource().map(|resource| {
            let name = resource.identity().unwrap_or("<unnamed>");
            match resource.version() {
                Some(version) => format!("{name} {}", display_version(&version)),
                None => name.to_string(),
            }
        });
        let mut blacklisted: Vec<String> = state
            .blacklist
            .iter()
            .map(ToString::to_string)
            .collect();
        blacklisted.sort();
        Self {
            ee: state.ee,
            repositories: state
                .repositories
                .iter()
                .map(|repo| repo.name().to_string())
                .collect(),
            framework,
            framework_capabilities: state
                .framework
                .as_ref()
                .map_or(0, |fw| fw.capability_count()),
            input_requirements: state
                .input
                .iter()
                .flat_map(|input| input.requirements(None))
                .map(|requirement| requirement.to_string())
                .collect(),
            effective: state.effective.keys().cloned().collect(),
            blacklisted,
        }
    }
}

impl fmt::Display for InitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "execution environment: {}", self.ee)?;
        writeln!(f, "repositories: {}", self.repositories.join(", "))?;
        match &self.framework {
            Some(framework) => writeln!(
                f,
                "framework: {framework} ({} capabilities)",
                self.framework_capabilities
            )?,
            None => writeln!(f, "framework: <not found>")?,
        }
        if !self.effective.is_empty() {
            writeln!(f, "effective: resolve, {}", self.effective.join(", "))?;
        }
        if !self.blacklisted.is_empty() {
            writeln!(f, "blacklisted: {}", self.blacklisted.join(", "))?;
        }
        writeln!(f, "input requirements:")?;
        for requirement in &self.input_requirements {
            writeln!(f, "  {requirement}")?;
        }
        Ok(())
    }
}
