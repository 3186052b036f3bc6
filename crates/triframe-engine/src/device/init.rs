use std::str::FromStr;

use anyhow::{Context, Result};

pub const BACKEND_ENV: &str = "TRIFRAME_BACKEND";
pub const VALIDATION_ENV: &str = "TRIFRAME_VALIDATION";

/// Graphics API the device is created on.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BackendChoice {
    /// Let wgpu pick the primary backend for the platform.
    #[default]
    Auto,
    Vulkan,
    Dx12,
    Metal,
    Gl,
}

impl BackendChoice {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            BackendChoice::Auto => wgpu::Backends::PRIMARY,
            BackendChoice::Vulkan => wgpu::Backends::VULKAN,
            BackendChoice::Dx12 => wgpu::Backends::DX12,
            BackendChoice::Metal => wgpu::Backends::METAL,
            BackendChoice::Gl => wgpu::Backends::GL,
        }
    }
}

impl FromStr for BackendChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(BackendChoice::Auto),
            "vulkan" | "vk" => Ok(BackendChoice::Vulkan),
            "dx12" | "d3d12" => Ok(BackendChoice::Dx12),
            "metal" | "mtl" => Ok(BackendChoice::Metal),
            "gl" | "gles" | "opengl" => Ok(BackendChoice::Gl),
            other => anyhow::bail!("unknown graphics backend '{other}'"),
        }
    }
}

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Graphics API selection. See [`BACKEND_ENV`].
    pub backend: BackendChoice,

    /// Enables the API validation layer.
    ///
    /// Defaults to on in debug builds.
    pub validation: bool,

    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: the swap-chain is a plain UNorm target.
    pub prefer_srgb: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            validation: cfg!(debug_assertions),
            prefer_srgb: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
            desired_maximum_frame_latency: 1,
        }
    }
}

impl DeviceConfig {
    /// Defaults overridden by [`BACKEND_ENV`] and [`VALIDATION_ENV`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(BACKEND_ENV) {
            config.backend = value
                .parse()
                .with_context(|| format!("invalid {BACKEND_ENV}"))?;
        }

        if let Some(value) = lookup(VALIDATION_ENV) {
            config.validation =
                parse_flag(&value).with_context(|| format!("invalid {VALIDATION_ENV}"))?;
        }

        Ok(config)
    }

    pub(crate) fn instance_flags(&self) -> wgpu::InstanceFlags {
        if self.validation {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!("Vulkan".parse::<BackendChoice>().unwrap(), BackendChoice::Vulkan);
        assert_eq!("d3d12".parse::<BackendChoice>().unwrap(), BackendChoice::Dx12);
        assert_eq!(" metal ".parse::<BackendChoice>().unwrap(), BackendChoice::Metal);
        assert_eq!("gles".parse::<BackendChoice>().unwrap(), BackendChoice::Gl);
        assert_eq!("".parse::<BackendChoice>().unwrap(), BackendChoice::Auto);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!("dx11".parse::<BackendChoice>().is_err());
    }

    #[test]
    fn backend_choice_maps_to_a_single_api() {
        assert_eq!(BackendChoice::Dx12.backends(), wgpu::Backends::DX12);
        assert_eq!(BackendChoice::Auto.backends(), wgpu::Backends::PRIMARY);
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = DeviceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, BackendChoice::Auto);
        assert_eq!(config.validation, cfg!(debug_assertions));
        assert!(!config.prefer_srgb);
    }

    #[test]
    fn environment_overrides_backend_and_validation() {
        let config = DeviceConfig::from_lookup(lookup(&[
            (BACKEND_ENV, "vulkan"),
            (VALIDATION_ENV, "off"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendChoice::Vulkan);
        assert!(!config.validation);
        assert_eq!(config.instance_flags(), wgpu::InstanceFlags::empty());
    }

    #[test]
    fn invalid_validation_flag_is_an_error() {
        let err = DeviceConfig::from_lookup(lookup(&[(VALIDATION_ENV, "maybe")])).unwrap_err();
        assert!(format!("{err:#}").contains(VALIDATION_ENV));
    }
}
