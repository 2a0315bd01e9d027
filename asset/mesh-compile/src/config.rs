//! Model-level compilation settings.

use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings that the owning model applies to every mesh it compiles.
///
/// Field names follow the model-compiler convention: lowercase,
/// undelimited.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompileConfig {
    /// Directory of the model file itself. Joined in front of `meshdir`
    /// when resolving relative asset paths.
    pub modelfiledir: Option<String>,

    /// Directory for mesh and skin files, relative to `modelfiledir`
    /// unless absolute.
    pub meshdir: Option<String>,

    /// Strip directory components from asset file references before
    /// resolving them.
    pub strippath: bool,

    /// Build convex-hull graphs for meshes that request one. Hulls are
    /// always built for meshes with no face data.
    pub convexhull: bool,

    /// Use the signed tetrahedral volume as-is. When false, each face
    /// contribution is taken as an absolute value (legacy behavior,
    /// biased for non-closed meshes).
    pub exactmeshinertia: bool,

    /// Fit primitive geoms from the axis-aligned bounding box instead of
    /// the equivalent inertia box.
    pub fitaabb: bool,

    /// Density used for mesh mass and inertia, in kg/m^3.
    pub density: f64,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            modelfiledir: None,
            meshdir: None,
            strippath: false,
            convexhull: true,
            exactmeshinertia: false,
            fitaabb: false,
            density: 1000.0,
        }
    }
}

impl CompileConfig {
    /// Resolve an asset file reference to a full path.
    ///
    /// `strippath` is applied first; an absolute result is used directly;
    /// otherwise `modelfiledir` and `meshdir` are joined in front.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_compile::CompileConfig;
    ///
    /// let config = CompileConfig {
    ///     modelfiledir: Some("/models/robot".to_string()),
    ///     meshdir: Some("meshes".to_string()),
    ///     ..Default::default()
    /// };
    /// let path = config.resolve_path("torso.stl");
    /// assert_eq!(path.to_str(), Some("/models/robot/meshes/torso.stl"));
    /// ```
    #[must_use]
    pub fn resolve_path(&self, file: &str) -> PathBuf {
        let file = if self.strippath {
            Path::new(file)
                .file_name()
                .map_or_else(|| file.to_string(), |f| f.to_string_lossy().to_string())
        } else {
            file.to_string()
        };

        let path = Path::new(&file);
        if path.is_absolute() {
            return path.to_path_buf();
        }

        let mut resolved = PathBuf::new();
        if let Some(dir) = &self.modelfiledir {
            resolved.push(dir);
        }
        if let Some(dir) = &self.meshdir {
            let dir = Path::new(dir);
            if dir.is_absolute() {
                resolved = dir.to_path_buf();
            } else {
                resolved.push(dir);
            }
        }
        resolved.push(path);
        resolved
    }
}
