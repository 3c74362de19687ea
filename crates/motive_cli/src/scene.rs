//! Scene file handling
//!
//! A scene declares targets with their initial values, named leaf motions,
//! and one root composition built from those names:
//!
//! ```toml
//! [defaults]
//! duration_ms = 300
//!
//! [[targets]]
//! name = "box"
//! values = { opacity = 1.0, width = "100px" }
//!
//! [motions.fade]
//! target = "box"
//! keyframes = [{ offset = 1.0, opacity = 0.0 }]
//!
//! [motions.grow]
//! target = "box"
//! timing = { duration_ms = 500 }
//! keyframes = [{ offset = 1.0, width = "300px" }]
//!
//! [root]
//! chain = ["fade", { parallel = ["grow", { reverse = "fade" }] }]
//! ```

use anyhow::{Context, Result};
use indexmap::IndexMap;
use motive_animation::{Motion, MotionContext, Scheduler, TimelineDriver};
use motive_core::{
    AnimatableProperty, KeyframeSequence, PartialTiming, PropertyValue, TargetId, Timing,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Top-level scene file
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Timing used where a motion leaves fields out
    #[serde(default)]
    pub defaults: PartialTiming,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub motions: IndexMap<String, MotionConfig>,
    pub root: Composition,
}

/// An animatable subject and its initial values
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    #[serde(default)]
    pub values: IndexMap<AnimatableProperty, PropertyValue>,
}

/// A named leaf motion
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MotionConfig {
    /// Name of a declared target
    pub target: String,
    pub keyframes: KeyframeSequence,
    #[serde(default)]
    pub timing: Option<PartialTiming>,
}

/// Composition expression for the scene root
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Composition {
    /// A motion declared under `[motions]`
    Motion(String),
    Chain { chain: Vec<Composition> },
    Parallel { parallel: Vec<Composition> },
    Reverse { reverse: Box<Composition> },
}

impl SceneConfig {
    /// Load a scene from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("No scene file at {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse scene")
    }
}

/// A scene built into a live motion tree on a timeline driver
pub struct Scene {
    pub driver: Rc<TimelineDriver>,
    /// Declared targets in file order
    pub targets: IndexMap<String, TargetId>,
    pub motions: IndexMap<String, Motion>,
    pub root: Motion,
}

impl Scene {
    /// Register targets, build every motion, then compose the root
    pub fn build(config: &SceneConfig, scheduler: Scheduler) -> Result<Self> {
        let driver = Rc::new(TimelineDriver::new());

        let mut targets = IndexMap::new();
        for (idx, target) in config.targets.iter().enumerate() {
            let id = TargetId(idx as u64 + 1);
            if targets.insert(target.name.clone(), id).is_some() {
                anyhow::bail!("Target `{}` is declared twice", target.name);
            }
            driver.register(id, target.values.clone());
        }

        let defaults = config.defaults.resolve(&Timing::default());
        let ctx =
            MotionContext::from_backend(driver.clone(), scheduler).with_default_timing(defaults);

        let mut motions = IndexMap::new();
        for (name, motion) in &config.motions {
            let target = *targets.get(&motion.target).with_context(|| {
                format!("Motion `{name}` refers to unknown target `{}`", motion.target)
            })?;

            let leaf = ctx
                .leaf(target, motion.keyframes.clone(), motion.timing)
                .with_context(|| format!("Invalid motion `{name}`"))?;
            motions.insert(name.clone(), leaf);
        }

        let root = compose(&config.root, &motions).context("Invalid root composition")?;
        tracing::debug!(
            targets = targets.len(),
            motions = motions.len(),
            root = %root.id(),
            "scene built"
        );

        Ok(Self {
            driver,
            targets,
            motions,
            root,
        })
    }

    pub fn target_name(&self, id: TargetId) -> Option<&str> {
        self.targets
            .iter()
            .find(|(_, &target)| target == id)
            .map(|(name, _)| name.as_str())
    }

    /// Structure of the root tree
    pub fn summary(&self) -> MotionSummary {
        MotionSummary::of(&self.root, self)
    }
}

fn compose(expr: &Composition, motions: &IndexMap<String, Motion>) -> Result<Motion> {
    let motion = match expr {
        Composition::Motion(name) => motions
            .get(name)
            .cloned()
            .with_context(|| format!("Unknown motion `{name}`"))?,
        Composition::Chain { chain } => Motion::sequence(compose_all(chain, motions)?)?,
        Composition::Parallel { parallel } => Motion::parallel(compose_all(parallel, motions)?)?,
        Composition::Reverse { reverse } => compose(reverse, motions)?.reverse(),
    };
    Ok(motion)
}

fn compose_all(exprs: &[Composition], motions: &IndexMap<String, Motion>) -> Result<Vec<Motion>> {
    exprs.iter().map(|expr| compose(expr, motions)).collect()
}

/// Serializable view of a motion tree
#[derive(Debug, Serialize)]
pub struct MotionSummary {
    pub id: u64,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyframes: Option<KeyframeSequence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MotionSummary>,
}

impl MotionSummary {
    fn of(motion: &Motion, scene: &Scene) -> Self {
        Self {
            id: motion.id().get(),
            kind: motion.kind_name(),
            target: motion.target().map(|id| {
                scene
                    .target_name(id)
                    .map_or_else(|| id.to_string(), str::to_string)
            }),
            timing: motion.timing().copied(),
            keyframes: motion.keyframes().cloned(),
            children: motion
                .children()
                .iter()
                .map(|child| MotionSummary::of(child, scene))
                .collect(),
        }
    }

    fn write_tree(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(out, "{indent}#{} {}", self.id, self.kind)?;

        if let Some(target) = &self.target {
            write!(out, " {target}")?;
        }
        if let Some(timing) = &self.timing {
            write!(
                out,
                " {}ms x{} fill={:?}",
                timing.duration_ms, timing.iterations, timing.fill
            )?;
        }
        writeln!(out)?;

        if let Some(keyframes) = &self.keyframes {
            for (frame, offset) in keyframes.iter().zip(keyframes.computed_offsets()) {
                write!(out, "{indent}    {offset:.2}")?;
                for (property, value) in &frame.properties {
                    write!(out, " {property}={value}")?;
                }
                if let Some(easing) = frame.easing {
                    write!(out, " ({easing})")?;
                }
                writeln!(out)?;
            }
        }

        for child in &self.children {
            child.write_tree(out, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for MotionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_tree(&mut out, 0)?;
        f.write_str(out.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;

    const SCENE: &str = r#"
        [defaults]
        duration_ms = 300

        [[targets]]
        name = "box"
        values = { opacity = 1.0, width = "100px" }

        [motions.fade]
        target = "box"
        keyframes = [{ offset = 1.0, opacity = 0.0 }]

        [motions.grow]
        target = "box"
        timing = { duration_ms = 500 }
        keyframes = [{ offset = 1.0, width = "300px" }]

        [root]
        chain = ["fade", { parallel = ["grow", { reverse = "fade" }] }]
    "#;

    #[test]
    fn test_parse_scene() {
        let config = SceneConfig::from_toml_str(SCENE).unwrap();

        assert_eq!(config.defaults.duration_ms, Some(300));
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.motions.keys().collect::<Vec<_>>(), ["fade", "grow"]);
        assert!(matches!(&config.root, Composition::Chain { chain } if chain.len() == 2));
    }

    #[test]
    fn test_build_scene_tree() {
        let pool = LocalPool::new();
        let config = SceneConfig::from_toml_str(SCENE).unwrap();
        let scene = Scene::build(&config, Scheduler::new(pool.spawner())).unwrap();

        let summary = scene.summary();
        assert_eq!(summary.kind, "sequential");
        assert_eq!(summary.children[0].target.as_deref(), Some("box"));
        assert_eq!(summary.children[0].timing.map(|t| t.duration_ms), Some(300));
        assert_eq!(summary.children[1].kind, "parallel");
        assert_eq!(summary.children[1].children[0].timing.map(|t| t.duration_ms), Some(500));

        // implicit start frames were filled from the target's values
        let fade = summary.children[0].keyframes.as_ref().unwrap();
        assert_eq!(fade.len(), 2);
        assert_eq!(
            fade.frames()[0].get(AnimatableProperty::Opacity),
            Some(&PropertyValue::Number(1.0))
        );

        let text = summary.to_string();
        assert!(text.starts_with(&format!("#{} sequential", summary.id)));
        assert!(text.contains("opacity=0"));
    }

    #[test]
    fn test_unknown_names_are_reported() {
        let pool = LocalPool::new();

        let config = SceneConfig::from_toml_str(
            r#"
            root = "missing"
            "#,
        )
        .unwrap();
        let err = Scene::build(&config, Scheduler::new(pool.spawner())).err().unwrap();
        assert!(format!("{err:#}").contains("Unknown motion `missing`"));

        let config = SceneConfig::from_toml_str(
            r#"
            root = "fade"

            [motions.fade]
            target = "ghost"
            keyframes = [{ offset = 0.0, opacity = 0.0 }]
            "#,
        )
        .unwrap();
        let err = Scene::build(&config, Scheduler::new(pool.spawner())).err().unwrap();
        assert!(format!("{err:#}").contains("unknown target `ghost`"));
    }

    #[test]
    fn test_empty_composites_are_rejected() {
        let pool = LocalPool::new();
        let config = SceneConfig::from_toml_str(
            r#"
            [[targets]]
            name = "box"

            [motions.fade]
            target = "box"
            keyframes = [{ offset = 0.0, opacity = 0.0 }]

            [root]
            parallel = []
            "#,
        )
        .unwrap();

        let err = Scene::build(&config, Scheduler::new(pool.spawner())).err().unwrap();
        assert!(format!("{err:#}").contains("at least one child"));
    }

    #[test]
    fn test_duplicate_targets_are_rejected() {
        let pool = LocalPool::new();
        let config = SceneConfig::from_toml_str(
            r#"
            root = "fade"

            [[targets]]
            name = "box"

            [[targets]]
            name = "box"
            "#,
        )
        .unwrap();

        let err = Scene::build(&config, Scheduler::new(pool.spawner())).err().unwrap();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(SceneConfig::from_toml_str(
            r#"
            root = "fade"
            speed = 2
            "#
        )
        .is_err());
    }
}
