//! Rasterizer states.

use std::hash::{Hash, Hasher};

use ash::vk;

use super::StateCollection;

/// Polygon fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Fill polygons.
    #[default]
    Solid,
    /// Draw polygon edges only.
    Wireframe,
}

impl FillMode {
    /// Convert to the Vulkan polygon mode.
    pub fn to_vk(self) -> vk::PolygonMode {
        match self {
            Self::Solid => vk::PolygonMode::FILL,
            Self::Wireframe => vk::PolygonMode::LINE,
        }
    }
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front-facing primitives.
    Front,
    /// Cull back-facing primitives.
    #[default]
    Back,
}

impl CullMode {
    /// Convert to the Vulkan cull mode flags.
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            Self::None => vk::CullModeFlags::NONE,
            Self::Front => vk::CullModeFlags::FRONT,
            Self::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Winding order that counts as front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise winding is front-facing.
    #[default]
    CounterClockwise,
    /// Clockwise winding is front-facing.
    Clockwise,
}

impl FrontFace {
    /// Convert to the Vulkan front face.
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            Self::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
            Self::Clockwise => vk::FrontFace::CLOCKWISE,
        }
    }
}

/// Immutable rasterizer state.
///
/// The float fields (bias clamp, slope bias, line width) participate in
/// equality and hashing through their bit patterns; built-in states never
/// carry NaN.
#[derive(Debug, Clone, Copy)]
pub struct RasterizerState {
    /// Polygon fill mode.
    pub fill_mode: FillMode,
    /// Face culling mode.
    pub cull_mode: CullMode,
    /// Front-facing winding order.
    pub front_face: FrontFace,
    /// Clamp fragments outside the depth range instead of discarding.
    pub depth_clamp_enable: bool,
    /// Constant depth bias applied to all fragments.
    pub depth_bias: i32,
    /// Maximum (or minimum) value of the computed depth bias.
    pub depth_bias_clamp: f32,
    /// Depth bias scaled by the primitive's slope.
    pub slope_scaled_depth_bias: f32,
    /// Rasterized line width.
    pub line_width: f32,
}

impl PartialEq for RasterizerState {
    fn eq(&self, other: &Self) -> bool {
        self.fill_mode == other.fill_mode
            && self.cull_mode == other.cull_mode
            && self.front_face == other.front_face
            && self.depth_clamp_enable == other.depth_clamp_enable
            && self.depth_bias == other.depth_bias
            && self.depth_bias_clamp.to_bits() == other.depth_bias_clamp.to_bits()
            && self.slope_scaled_depth_bias.to_bits() == other.slope_scaled_depth_bias.to_bits()
            && self.line_width.to_bits() == other.line_width.to_bits()
    }
}

impl Eq for RasterizerState {}

impl Hash for RasterizerState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fill_mode.hash(state);
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.depth_clamp_enable.hash(state);
        self.depth_bias.hash(state);
        self.depth_bias_clamp.to_bits().hash(state);
        self.slope_scaled_depth_bias.to_bits().hash(state);
        self.line_width.to_bits().hash(state);
    }
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self::cull_back()
    }
}

impl RasterizerState {
    fn base(cull_mode: CullMode) -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode,
            front_face: FrontFace::CounterClockwise,
            depth_clamp_enable: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            line_width: 1.0,
        }
    }

    /// Solid fill, no culling.
    pub fn cull_none() -> Self {
        Self::base(CullMode::None)
    }

    /// Solid fill, front faces culled.
    pub fn cull_front() -> Self {
        Self::base(CullMode::Front)
    }

    /// Solid fill, back faces culled.
    pub fn cull_back() -> Self {
        Self::base(CullMode::Back)
    }

    /// Wireframe rendering, no culling.
    pub fn wireframe() -> Self {
        Self {
            fill_mode: FillMode::Wireframe,
            ..Self::base(CullMode::None)
        }
    }

    /// Build the Vulkan rasterization create info.
    pub fn to_vk(&self) -> vk::PipelineRasterizationStateCreateInfo<'static> {
        vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(self.depth_clamp_enable)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.fill_mode.to_vk())
            .cull_mode(self.cull_mode.to_vk())
            .front_face(self.front_face.to_vk())
            .depth_bias_enable(self.depth_bias != 0 || self.slope_scaled_depth_bias != 0.0)
            .depth_bias_constant_factor(self.depth_bias as f32)
            .depth_bias_clamp(self.depth_bias_clamp)
            .depth_bias_slope_factor(self.slope_scaled_depth_bias)
            .line_width(self.line_width)
    }
}

/// Build the canonical rasterizer state collection.
pub fn built_in_rasterizer_states() -> StateCollection<RasterizerState> {
    StateCollection::new(vec![
        ("CullNone", RasterizerState::cull_none()),
        ("CullFront", RasterizerState::cull_front()),
        ("CullBack", RasterizerState::cull_back()),
        ("Wireframe", RasterizerState::wireframe()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(state: &RasterizerState) -> u64 {
        let mut hasher = DefaultHasher::new();
        state.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_built_in_states() {
        let states = built_in_rasterizer_states();

        let wireframe = states.get("Wireframe").unwrap();
        assert_eq!(wireframe.fill_mode, FillMode::Wireframe);
        assert_eq!(wireframe.cull_mode, CullMode::None);

        let cull_back = states.get("CullBack").unwrap();
        assert_eq!(cull_back.cull_mode, CullMode::Back);
        assert_eq!(cull_back.fill_mode, FillMode::Solid);
    }

    #[test]
    fn test_equal_configuration_equal_hash() {
        let a = RasterizerState::cull_back();
        let b = RasterizerState::cull_back();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = RasterizerState::wireframe();
        assert_ne!(a, c);
    }

    #[test]
    fn test_to_vk() {
        let info = RasterizerState::wireframe().to_vk();
        assert_eq!(info.polygon_mode, vk::PolygonMode::LINE);
        assert_eq!(info.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(info.line_width, 1.0);
    }
}
