//! Typed view of the upscaler INI
//!
//! `read_options` never fails: missing sections and keys read as auto.
//! `apply_options` touches only keys whose value actually changes and
//! reports them as `Section.Key`.

use std::path::Path;

use super::document::IniDocument;
use super::mapping::{
    FrameGenMode, GpuSpoof, GraphicsApi, OptionTable, QualityMode, UpscalerBackend,
};
use crate::error::{Result, ScalerError};

const UPSCALERS: &str = "Upscalers";
const FRAME_GEN: &str = "FrameGen";
const SPOOFING: &str = "Spoofing";
const QUALITY: &str = "QualityOverrides";

const QUALITY_RATIO_KEYS: &[&str] = &[
    "QualityRatioUltraQuality",
    "QualityRatioQuality",
    "QualityRatioBalanced",
    "QualityRatioPerformance",
    "QualityRatioUltraPerformance",
];

/// Operator-selected settings written into the upscaler INI on install
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScalerOptions {
    pub gpu_spoof: GpuSpoof,
    pub frame_gen: FrameGenMode,
    pub upscaler: UpscalerBackend,
    pub quality: QualityMode,
    /// Also force the quality mode's resolution ratio onto every in-game preset
    pub quality_override: bool,
}

/// Per-API upscaler codes as they appear on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscalerCodes {
    pub dx11: String,
    pub dx12: String,
    pub vulkan: String,
}

pub fn read_options(doc: &IniDocument) -> ScalerOptions {
    let gpu_spoof = match doc.get(SPOOFING, "Dxgi").map(str::to_ascii_lowercase).as_deref() {
        Some("false") => GpuSpoof::Off,
        Some("true") => match doc.get(SPOOFING, "SpoofedVendorId") {
            Some(vendor) if !vendor.eq_ignore_ascii_case("auto") => {
                GpuSpoof::from_vendor_id(vendor).unwrap_or(GpuSpoof::Auto)
            }
            _ => GpuSpoof::Nvidia,
        },
        _ => GpuSpoof::Auto,
    };

    // Dx12 supports every backend, so it carries the generic selection
    let upscaler = doc
        .get(UPSCALERS, GraphicsApi::Dx12.key())
        .map(|code| GraphicsApi::Dx12.backend_for(code))
        .unwrap_or_default();

    ScalerOptions {
        gpu_spoof,
        frame_gen: doc
            .get(FRAME_GEN, "FGType")
            .map(FrameGenMode::from_code)
            .unwrap_or_default(),
        upscaler,
        quality: doc
            .get(QUALITY, "QualityPreset")
            .map(QualityMode::from_code)
            .unwrap_or_default(),
        quality_override: doc
            .get(QUALITY, "QualityRatioOverrideEnabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
    }
}

pub fn read_upscaler_codes(doc: &IniDocument) -> UpscalerCodes {
    let get = |api: GraphicsApi| doc.get(UPSCALERS, api.key()).unwrap_or("auto").to_string();
    UpscalerCodes {
        dx11: get(GraphicsApi::Dx11),
        dx12: get(GraphicsApi::Dx12),
        vulkan: get(GraphicsApi::Vulkan),
    }
}

/// Apply `options` to `doc`, returning the keys that changed
pub fn apply_options(doc: &mut IniDocument, options: &ScalerOptions) -> Vec<String> {
    let mut changed = Vec::new();
    let mut set = |section: &str, key: &str, value: &str| {
        if doc.set(section, key, value) {
            changed.push(format!("{}.{}", section, key));
        }
    };

    match options.gpu_spoof {
        GpuSpoof::Auto => {
            set(SPOOFING, "Dxgi", "auto");
            set(SPOOFING, "SpoofedVendorId", "auto");
            set(SPOOFING, "SpoofedDeviceId", "auto");
        }
        GpuSpoof::Off => set(SPOOFING, "Dxgi", "false"),
        spoof => {
            if let Some((vendor, device)) = spoof.ids() {
                set(SPOOFING, "Dxgi", "true");
                set(SPOOFING, "SpoofedVendorId", vendor);
                set(SPOOFING, "SpoofedDeviceId", device);
            }
        }
    }

    set(FRAME_GEN, "FGType", options.frame_gen.code());

    for api in GraphicsApi::ALL {
        set(UPSCALERS, api.key(), api.code_for(options.upscaler));
    }

    set(QUALITY, "QualityPreset", options.quality.code());
    if options.quality_override {
        set(QUALITY, "QualityRatioOverrideEnabled", "true");
        if let Some(ratio) = options.quality.ratio() {
            let value = format!("{:.2}", ratio);
            for key in QUALITY_RATIO_KEYS {
                set(QUALITY, key, &value);
            }
        }
    } else {
        set(QUALITY, "QualityRatioOverrideEnabled", "auto");
    }

    changed
}

/// Load, apply and save in one step. The file is only rewritten when a key changed.
pub fn write_options(path: &Path, options: &ScalerOptions) -> Result<Vec<String>> {
    let mut doc =
        IniDocument::load(path).map_err(|e| ScalerError::from_io(path, "Failed to read INI", e))?;
    let changed = apply_options(&mut doc, options);
    if !changed.is_empty() {
        doc.save(path)
            .map_err(|e| ScalerError::from_io(path, "Failed to write INI", e))?;
    }
    Ok(changed)
}

/// Options currently stored in `path`; a missing or unreadable file yields defaults
pub fn load_options(path: &Path) -> ScalerOptions {
    IniDocument::load(path)
        .map(|doc| read_options(&doc))
        .unwrap_or_default()
}
