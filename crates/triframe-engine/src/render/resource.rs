//! Opaque GPU resource handles and their creation descriptions.

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn id(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// Vertex buffer owned by a backend.
    BufferHandle
);
handle!(
    /// Compiled shader stage owned by a backend.
    ShaderHandle
);
handle!(
    /// Graphics pipeline state owned by a backend.
    PipelineHandle
);

/// Any releasable backend resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Resource {
    Buffer(BufferHandle),
    Shader(ShaderHandle),
    Pipeline(PipelineHandle),
}

impl From<BufferHandle> for Resource {
    fn from(handle: BufferHandle) -> Self {
        Resource::Buffer(handle)
    }
}

impl From<ShaderHandle> for Resource {
    fn from(handle: ShaderHandle) -> Self {
        Resource::Shader(handle)
    }
}

impl From<PipelineHandle> for Resource {
    fn from(handle: PipelineHandle) -> Self {
        Resource::Pipeline(handle)
    }
}

/// Immutable vertex data uploaded once at creation.
#[derive(Debug, Copy, Clone)]
pub struct VertexBufferDescription<'a> {
    pub label: &'a str,
    pub contents: &'a [u8],
}

/// Shader program text embedded in the binary.
///
/// `id` is the fixed resource identifier used for labels and diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderSource {
    pub id: &'static str,
    pub code: &'static str,
}

impl ShaderSource {
    /// Whether `code` declares a function named exactly `entry_point`.
    pub fn declares_entry_point(&self, entry_point: &str) -> bool {
        self.code.match_indices("fn").any(|(at, _)| {
            let starts_token = self.code[..at]
                .chars()
                .next_back()
                .is_none_or(|c| !is_ident_char(c));
            let rest = &self.code[at + 2..];
            let name = rest.trim_start();

            starts_token
                && name.len() < rest.len()
                && name
                    .strip_prefix(entry_point)
                    .is_some_and(|after| after.trim_start().starts_with('('))
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// One stage compiled from a [`ShaderSource`] at `entry_point`.
#[derive(Debug, Copy, Clone)]
pub struct ShaderDescription<'a> {
    pub source: &'a ShaderSource,
    pub stage: ShaderStage,
    pub entry_point: &'a str,
}

impl<'a> ShaderDescription<'a> {
    pub fn vertex(source: &'a ShaderSource, entry_point: &'a str) -> Self {
        Self {
            source,
            stage: ShaderStage::Vertex,
            entry_point,
        }
    }

    pub fn pixel(source: &'a ShaderSource, entry_point: &'a str) -> Self {
        Self {
            source,
            stage: ShaderStage::Pixel,
            entry_point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: ShaderSource = ShaderSource {
        id: "entry.wgsl",
        code: "// calls VSMain\n@vertex\nfn VSMainX() {}\n@vertex fn  VSMain (@location(0) p: vec3<f32>) {}\nfn_PSMain() {}",
    };

    #[test]
    fn entry_point_matches_whole_function_names_only() {
        assert!(SOURCE.declares_entry_point("VSMain"));
        assert!(SOURCE.declares_entry_point("VSMainX"));
        assert!(!SOURCE.declares_entry_point("VSMa"));
        assert!(!SOURCE.declares_entry_point("PSMain"));
        assert!(!SOURCE.declares_entry_point("calls"));
    }
}
