//! Label/code tables for every configurable option family
//!
//! Labels are what a front end shows; codes are what lands in the INI.
//! Lookups never fail: anything unknown resolves to the family's auto value.

/// A closed option family backed by a static `(value, label, code)` table
pub trait OptionTable: Sized + Copy + PartialEq + 'static {
    const TABLE: &'static [(Self, &'static str, &'static str)];
    const AUTO: Self;

    fn label(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(v, _, _)| *v == self)
            .map(|(_, label, _)| *label)
            .unwrap_or("Auto")
    }

    fn code(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(v, _, _)| *v == self)
            .map(|(_, _, code)| *code)
            .unwrap_or("auto")
    }

    fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::TABLE
            .iter()
            .find(|(_, l, _)| l.eq_ignore_ascii_case(label))
            .map(|(v, _, _)| *v)
            .unwrap_or(Self::AUTO)
    }

    fn from_code(code: &str) -> Self {
        let code = code.trim();
        Self::TABLE
            .iter()
            .find(|(_, _, c)| c.eq_ignore_ascii_case(code))
            .map(|(v, _, _)| *v)
            .unwrap_or(Self::AUTO)
    }

    fn all() -> Vec<Self> {
        Self::TABLE.iter().map(|(v, _, _)| *v).collect()
    }
}

// ============================================================================
// GPU Spoofing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuSpoof {
    #[default]
    Auto,
    Off,
    Nvidia,
    Amd,
    Intel,
}

impl OptionTable for GpuSpoof {
    const TABLE: &'static [(Self, &'static str, &'static str)] = &[
        (GpuSpoof::Auto, "Auto", "auto"),
        (GpuSpoof::Off, "Disabled", "off"),
        (GpuSpoof::Nvidia, "NVIDIA (RTX 4090)", "nvidia"),
        (GpuSpoof::Amd, "AMD (RX 7900 XTX)", "amd"),
        (GpuSpoof::Intel, "Intel (Arc A770)", "intel"),
    ];
    const AUTO: Self = GpuSpoof::Auto;
}

impl GpuSpoof {
    /// PCI vendor and device id reported to the game
    pub fn ids(self) -> Option<(&'static str, &'static str)> {
        match self {
            GpuSpoof::Nvidia => Some(("0x10de", "0x2684")),
            GpuSpoof::Amd => Some(("0x1002", "0x744c")),
            GpuSpoof::Intel => Some(("0x8086", "0x56a0")),
            GpuSpoof::Auto | GpuSpoof::Off => None,
        }
    }

    pub fn from_vendor_id(vendor: &str) -> Option<Self> {
        [GpuSpoof::Nvidia, GpuSpoof::Amd, GpuSpoof::Intel]
            .into_iter()
            .find(|g| g.ids().is_some_and(|(v, _)| v.eq_ignore_ascii_case(vendor.trim())))
    }
}

// ============================================================================
// Frame Generation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameGenMode {
    #[default]
    Auto,
    Off,
    OptiFg,
    Nukems,
}

impl OptionTable for FrameGenMode {
    const TABLE: &'static [(Self, &'static str, &'static str)] = &[
        (FrameGenMode::Auto, "Auto", "auto"),
        (FrameGenMode::Off, "Disabled", "nofg"),
        (FrameGenMode::OptiFg, "OptiFG (FSR3 FG)", "optifg"),
        (FrameGenMode::Nukems, "Nukem's DLSSG to FSR3", "nukems"),
    ];
    const AUTO: Self = FrameGenMode::Auto;
}

// ============================================================================
// Upscaler Backends
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpscalerBackend {
    #[default]
    Auto,
    Xess,
    Fsr21,
    Fsr22,
    Fsr31,
    Dlss,
}

impl OptionTable for UpscalerBackend {
    const TABLE: &'static [(Self, &'static str, &'static str)] = &[
        (UpscalerBackend::Auto, "Auto", "auto"),
        (UpscalerBackend::Xess, "XeSS", "xess"),
        (UpscalerBackend::Fsr21, "FSR 2.1", "fsr21"),
        (UpscalerBackend::Fsr22, "FSR 2.2", "fsr22"),
        (UpscalerBackend::Fsr31, "FSR 3.1", "fsr31"),
        (UpscalerBackend::Dlss, "DLSS", "dlss"),
    ];
    const AUTO: Self = UpscalerBackend::Auto;
}

/// Graphics APIs with their own upscaler key and supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsApi {
    Dx11,
    Dx12,
    Vulkan,
}

// Dx11 runs FSR 2.1 only through the Dx12 bridge
const DX11_CODES: &[(UpscalerBackend, &str)] = &[
    (UpscalerBackend::Auto, "auto"),
    (UpscalerBackend::Xess, "xess"),
    (UpscalerBackend::Fsr21, "fsr21_12"),
    (UpscalerBackend::Fsr22, "fsr22"),
    (UpscalerBackend::Fsr31, "fsr31"),
    (UpscalerBackend::Dlss, "dlss"),
];

const DX12_CODES: &[(UpscalerBackend, &str)] = &[
    (UpscalerBackend::Auto, "auto"),
    (UpscalerBackend::Xess, "xess"),
    (UpscalerBackend::Fsr21, "fsr21"),
    (UpscalerBackend::Fsr22, "fsr22"),
    (UpscalerBackend::Fsr31, "fsr31"),
    (UpscalerBackend::Dlss, "dlss"),
];

// No XeSS on Vulkan
const VULKAN_CODES: &[(UpscalerBackend, &str)] = &[
    (UpscalerBackend::Auto, "auto"),
    (UpscalerBackend::Fsr21, "fsr21"),
    (UpscalerBackend::Fsr22, "fsr22"),
    (UpscalerBackend::Fsr31, "fsr31"),
    (UpscalerBackend::Dlss, "dlss"),
];

/// Alternate spellings accepted when reading
const CODE_ALIASES: &[(&str, UpscalerBackend)] = &[
    ("fsr22_12", UpscalerBackend::Fsr22),
    ("fsr31_12", UpscalerBackend::Fsr31),
    ("xess_12", UpscalerBackend::Xess),
];

impl GraphicsApi {
    pub const ALL: [GraphicsApi; 3] = [GraphicsApi::Dx11, GraphicsApi::Dx12, GraphicsApi::Vulkan];

    /// INI key under `[Upscalers]`
    pub fn key(self) -> &'static str {
        match self {
            GraphicsApi::Dx11 => "Dx11Upscaler",
            GraphicsApi::Dx12 => "Dx12Upscaler",
            GraphicsApi::Vulkan => "VulkanUpscaler",
        }
    }

    fn codes(self) -> &'static [(UpscalerBackend, &'static str)] {
        match self {
            GraphicsApi::Dx11 => DX11_CODES,
            GraphicsApi::Dx12 => DX12_CODES,
            GraphicsApi::Vulkan => VULKAN_CODES,
        }
    }

    pub fn supports(self, backend: UpscalerBackend) -> bool {
        self.codes().iter().any(|(b, _)| *b == backend)
    }

    /// Closest backend this API can run
    pub fn nearest_supported(self, backend: UpscalerBackend) -> UpscalerBackend {
        if self.supports(backend) {
            return backend;
        }
        match backend {
            // XeSS is a vendor-agnostic temporal upscaler; FSR 3.1 is the closest match
            UpscalerBackend::Xess => UpscalerBackend::Fsr31,
            UpscalerBackend::Fsr21 | UpscalerBackend::Fsr22 => UpscalerBackend::Fsr31,
            _ => UpscalerBackend::Auto,
        }
    }

    /// Code written for a generic backend, degraded when unsupported
    pub fn code_for(self, backend: UpscalerBackend) -> &'static str {
        let backend = self.nearest_supported(backend);
        self.codes()
            .iter()
            .find(|(b, _)| *b == backend)
            .map(|(_, code)| *code)
            .unwrap_or("auto")
    }

    /// Generic backend for a code found under this API's key
    pub fn backend_for(self, code: &str) -> UpscalerBackend {
        let code = code.trim();
        self.codes()
            .iter()
            .find(|(_, c)| c.eq_ignore_ascii_case(code))
            .map(|(b, _)| *b)
            .or_else(|| {
                CODE_ALIASES
                    .iter()
                    .find(|(c, _)| c.eq_ignore_ascii_case(code))
                    .map(|(_, b)| *b)
            })
            .unwrap_or(UpscalerBackend::Auto)
    }
}

// ============================================================================
// Quality Modes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityMode {
    #[default]
    Auto,
    NativeAa,
    UltraQuality,
    Quality,
    Balanced,
    Performance,
    UltraPerformance,
}

impl OptionTable for QualityMode {
    const TABLE: &'static [(Self, &'static str, &'static str)] = &[
        (QualityMode::Auto, "Auto", "auto"),
        (QualityMode::NativeAa, "Native AA", "native_aa"),
        (QualityMode::UltraQuality, "Ultra Quality", "ultra_quality"),
        (QualityMode::Quality, "Quality", "quality"),
        (QualityMode::Balanced, "Balanced", "balanced"),
        (QualityMode::Performance, "Performance", "performance"),
        (QualityMode::UltraPerformance, "Ultra Performance", "ultra_performance"),
    ];
    const AUTO: Self = QualityMode::Auto;
}

impl QualityMode {
    /// Render-resolution divisor for this mode
    pub fn ratio(self) -> Option<f32> {
        match self {
            QualityMode::Auto => None,
            QualityMode::NativeAa => Some(1.0),
            QualityMode::UltraQuality => Some(1.3),
            QualityMode::Quality => Some(1.5),
            QualityMode::Balanced => Some(1.7),
            QualityMode::Performance => Some(2.0),
            QualityMode::UltraPerformance => Some(3.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_resolve_to_auto() {
        assert_eq!(GpuSpoof::from_label("Voodoo 3"), GpuSpoof::Auto);
        assert_eq!(FrameGenMode::from_code("turbo"), FrameGenMode::Auto);
        assert_eq!(QualityMode::from_code(""), QualityMode::Auto);
        assert_eq!(GraphicsApi::Dx12.backend_for("???"), UpscalerBackend::Auto);
    }

    #[test]
    fn labels_and_codes_are_bidirectional() {
        for mode in QualityMode::all() {
            assert_eq!(QualityMode::from_label(mode.label()), mode);
            assert_eq!(QualityMode::from_code(mode.code()), mode);
        }
        for spoof in GpuSpoof::all() {
            assert_eq!(GpuSpoof::from_label(spoof.label()), spoof);
        }
    }

    #[test]
    fn per_api_codes() {
        assert_eq!(GraphicsApi::Dx11.code_for(UpscalerBackend::Fsr21), "fsr21_12");
        assert_eq!(GraphicsApi::Dx12.code_for(UpscalerBackend::Fsr21), "fsr21");
        assert_eq!(GraphicsApi::Vulkan.code_for(UpscalerBackend::Xess), "fsr31");
        assert_eq!(GraphicsApi::Dx11.backend_for("fsr21_12"), UpscalerBackend::Fsr21);
        assert_eq!(GraphicsApi::Dx11.backend_for("fsr22_12"), UpscalerBackend::Fsr22);
    }

    #[test]
    fn every_backend_maps_to_a_supported_code() {
        for api in GraphicsApi::ALL {
            for backend in UpscalerBackend::all() {
                let code = api.code_for(backend);
                assert!(api.supports(api.backend_for(code)));
            }
        }
    }
}
