//! Tool registry and capability gating.
//!
//! Tools never decide on their own whether the mesh supports them. Each one
//! declares a [`ToolClass`], and the registry enables it from the committed
//! mesh's [`MeshCapabilities`].

use tracing::{debug, info};
use tripaint_mesh::MeshCapabilities;

/// What a tool needs from the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolClass {
    /// Works on any loaded mesh
    Basic,
    /// Needs the manifold solid
    Advanced,
}

impl ToolClass {
    /// Whether a tool of this class may run; nothing runs without a mesh
    pub fn is_enabled(self, capabilities: Option<MeshCapabilities>) -> bool {
        match (self, capabilities) {
            (_, None) => false,
            (ToolClass::Basic, Some(_)) => true,
            (ToolClass::Advanced, Some(caps)) => caps.solid,
        }
    }
}

/// An interactive tool
pub trait Tool {
    fn name(&self) -> &str;

    fn class(&self) -> ToolClass;

    /// Called after every successful mesh swap
    fn on_new_geometry_loaded(&mut self, _capabilities: MeshCapabilities) {}
}

/// The editor's built-in tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardTool {
    TrianglePainter,
    PaintBucket,
    Brush,
    TextEditor,
    VolumeFill,
    Extrusion,
    Segmentation,
}

impl StandardTool {
    pub const ALL: [StandardTool; 7] = [
        StandardTool::TrianglePainter,
        StandardTool::PaintBucket,
        StandardTool::Brush,
        StandardTool::TextEditor,
        StandardTool::VolumeFill,
        StandardTool::Extrusion,
        StandardTool::Segmentation,
    ];
}

impl Tool for StandardTool {
    fn name(&self) -> &str {
        match self {
            StandardTool::TrianglePainter => "Triangle Painter",
            StandardTool::PaintBucket => "Paint Bucket",
            StandardTool::Brush => "Brush",
            StandardTool::TextEditor => "Text Editor",
            StandardTool::VolumeFill => "Volume Fill",
            StandardTool::Extrusion => "Extrusion",
            StandardTool::Segmentation => "Segmentation",
        }
    }

    fn class(&self) -> ToolClass {
        match self {
            StandardTool::TrianglePainter
            | StandardTool::PaintBucket
            | StandardTool::Brush
            | StandardTool::TextEditor => ToolClass::Basic,
            StandardTool::VolumeFill | StandardTool::Extrusion | StandardTool::Segmentation => {
                ToolClass::Advanced
            }
        }
    }
}

/// Registered tools plus the selection
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    active: usize,
    capabilities: Option<MeshCapabilities>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`StandardTool`]; the triangle painter is the fallback
    pub fn with_standard_tools() -> Self {
        let mut registry = Self::new();
        for tool in StandardTool::ALL {
            registry.register(Box::new(tool));
        }
        registry
    }

    /// Add a tool, returning its index. The first tool is the fallback.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> usize {
        debug!("Registered tool '{}' ({:?})", tool.name(), tool.class());
        self.tools.push(tool);
        self.tools.len() - 1
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.iter().map(|t| t.name())
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.tools
            .get(index)
            .is_some_and(|t| t.class().is_enabled(self.capabilities))
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&dyn Tool> {
        self.tools.get(self.active).map(|t| t.as_ref())
    }

    /// Select a tool; refused when it is unknown or disabled
    pub fn select(&mut self, index: usize) -> bool {
        if !self.is_enabled(index) {
            return false;
        }
        self.active = index;
        true
    }

    pub fn select_by_name(&mut self, name: &str) -> bool {
        match self.tools.iter().position(|t| t.name() == name) {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Broadcast a mesh swap and fall back to the first tool if the active one got disabled
    pub fn on_new_geometry_loaded(&mut self, capabilities: MeshCapabilities) {
        self.capabilities = Some(capabilities);
        for tool in &mut self.tools {
            tool.on_new_geometry_loaded(capabilities);
        }
        if !self.is_enabled(self.active) {
            info!(
                "Tool {:?} disabled for this mesh, falling back to the first tool",
                self.active().map(|t| t.name().to_string())
            );
            self.active = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLID: MeshCapabilities = MeshCapabilities { solid: true };
    const SURFACE: MeshCapabilities = MeshCapabilities { solid: false };

    #[test]
    fn test_class_gating() {
        assert!(!ToolClass::Basic.is_enabled(None));
        assert!(ToolClass::Basic.is_enabled(Some(SURFACE)));
        assert!(!ToolClass::Advanced.is_enabled(Some(SURFACE)));
        assert!(ToolClass::Advanced.is_enabled(Some(SOLID)));
    }

    #[test]
    fn test_nothing_selectable_without_mesh() {
        let mut registry = ToolRegistry::with_standard_tools();
        assert!(!registry.select(1));
        assert_eq!(registry.active_index(), 0);
    }

    #[test]
    fn test_fallback_when_capability_lost() {
        let mut registry = ToolRegistry::with_standard_tools();
        registry.on_new_geometry_loaded(SOLID);
        assert!(registry.select_by_name("Extrusion"));
        assert_eq!(registry.active().map(|t| t.name()), Some("Extrusion"));

        registry.on_new_geometry_loaded(SURFACE);
        assert_eq!(registry.active().map(|t| t.name()), Some("Triangle Painter"));
        assert!(!registry.select_by_name("Segmentation"));
        assert!(registry.select_by_name("Paint Bucket"));
        assert!(!registry.select_by_name("Lasso"));
    }
}
