//! Manifest compilation pipeline
//!
//! load -> plan capacity -> resolve templates -> allocate -> emit -> write.
//! Every check runs before the output file is touched, and the manifest is
//! written to a temporary file that replaces the output in one rename.

use super::allocator::InstanceAllocator;
use super::emitter::{Manifest, ManifestEmitter};
use crate::config::{CompilerConfig, GroupSpec};
use crate::error::{Result, VmComposeError};
use crate::network::CapacityPlanner;
use crate::template::TemplateRegistry;
use std::io::Write;
use std::path::Path;

/// Index range assigned to one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRange {
    /// Group name
    pub group: String,
    /// First instance index
    pub first: u8,
    /// Last instance index
    pub last: u8,
}

/// What a compilation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSummary {
    /// Total instances
    pub total: u32,
    /// Templates written, in emission order
    pub templates: Vec<String>,
    /// Index ranges per contributing group, in declaration order
    pub groups: Vec<GroupRange>,
}

impl std::fmt::Display for CompileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} containers from {} groups using {} templates",
            self.total,
            self.groups.len(),
            self.templates.len()
        )
    }
}

/// Manifest compiler
pub struct ManifestCompiler {
    config: CompilerConfig,
}

impl ManifestCompiler {
    /// Create a compiler
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compiler settings
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Read both input documents
    pub fn load(&self) -> Result<(GroupSpec, TemplateRegistry)> {
        let spec = GroupSpec::parse_file(&self.config.group_file)
            .map_err(|e| with_path(e, &self.config.group_file))?;
        let registry = TemplateRegistry::parse_file(&self.config.template_file)
            .map_err(|e| with_path(e, &self.config.template_file))?;

        tracing::info!(
            "Loaded {} groups and {} templates",
            spec.len(),
            registry.len()
        );
        Ok((spec, registry))
    }

    /// Render the manifest without writing it
    pub fn render(
        &self,
        spec: GroupSpec,
        registry: &TemplateRegistry,
    ) -> Result<(Manifest, CompileSummary)> {
        self.config.validate()?;

        let plan = CapacityPlanner::plan(spec)?;
        let emitter = ManifestEmitter::new(registry, &self.config);
        // Surfaces missing templates before any instance is allocated.
        emitter.resolve_templates(&plan)?;

        let instances = InstanceAllocator::new(&plan, &self.config.networks).allocate();
        let manifest = emitter.emit(&plan, &instances)?;

        let mut groups: Vec<GroupRange> = Vec::new();
        for instance in &instances {
            match groups.last_mut() {
                Some(range) if range.group == instance.group => range.last = instance.index,
                _ => groups.push(GroupRange {
                    group: instance.group.to_string(),
                    first: instance.index,
                    last: instance.index,
                }),
            }
        }

        let summary = CompileSummary {
            total: plan.total(),
            templates: manifest.templates.clone(),
            groups,
        };

        Ok((manifest, summary))
    }

    /// Load, render and write the manifest to the configured output
    pub fn compile(&self) -> Result<CompileSummary> {
        let (spec, registry) = self.load()?;
        let (manifest, summary) = self.render(spec, &registry)?;

        write_manifest(&self.config.output, &manifest.text)?;
        tracing::info!("Wrote {}", self.config.output.display());

        Ok(summary)
    }
}

/// Replace `path` with `text` in a single rename
pub fn write_manifest(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    file.persist(path).map_err(|e| VmComposeError::Io(e.error))?;
    Ok(())
}

fn with_path(err: VmComposeError, path: &Path) -> VmComposeError {
    match err {
        VmComposeError::Parse { message, .. } => VmComposeError::Parse {
            source_name: path.display().to_string(),
            message,
        },
        other => other,
    }
}
