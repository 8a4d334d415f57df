// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device optical profiles.
//!
//! A [`DeviceOpticalProfile`] bundles everything the pipeline needs to know
//! about one phone-in-holder combination: the lens correction polynomial or
//! spline, chromatic aberration terms, physical screen geometry, and display
//! timing. Profiles are selected once at startup by matching the hardware
//! model string ([`DeviceOpticalProfile::for_model`]); unmatched models fall
//! back to the Note 4 profile rather than failing. The selected profile is
//! owned by the session and passed by reference into the scheduler and the
//! mesh builder; nothing reaches for it through globals.
//!
//! # Radial correction
//!
//! [`LensProfile::scale_at`] evaluates the correction scale at a squared
//! tan-angle radius using one of two numeric policies:
//!
//! - **Reciprocal polynomial** (legacy holders):
//!   `1 / (K0 + r²(K1 + r²(K2 + r²·K3)))`.
//! - **Catmull-Rom spline** (current holders): a cubic Hermite spline
//!   through N samples spaced evenly in r² over `[0, MaxR²]`, with
//!   one-sided tangents at the boundaries and linear extrapolation past the
//!   last sample.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Maximum number of spline/polynomial coefficients a profile can carry.
pub const MAX_COEFFICIENTS: usize = 21;

/// Which numeric policy [`LensProfile::scale_at`] uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistortionEquation {
    /// Reciprocal 4-term polynomial in r².
    RecipPoly4,
    /// Catmull-Rom spline through 11 samples.
    CatmullRom10,
    /// Catmull-Rom spline through 21 samples.
    CatmullRom20,
}

impl DistortionEquation {
    /// Number of spline samples, where applicable.
    const fn sample_count(self) -> usize {
        match self {
            Self::RecipPoly4 => 4,
            Self::CatmullRom10 => 11,
            Self::CatmullRom20 => 21,
        }
    }
}

/// Lens correction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LensProfile {
    /// Numeric policy for the radial correction.
    pub equation: DistortionEquation,
    /// Polynomial or spline coefficients; only the leading
    /// [`DistortionEquation::sample_count`] entries are meaningful.
    pub coefficients: [f32; MAX_COEFFICIENTS],
    /// Tan-angle radius the spline samples span.
    pub max_radius: f32,
    /// Chromatic aberration terms: red constant, red r² slope, blue
    /// constant, blue r² slope. Green is the reference channel.
    pub chromatic_aberration: [f32; 4],
    /// Millimeters of screen per tangent unit at the lens center, in meters.
    pub meters_per_tan_angle: f32,
}

impl LensProfile {
    /// Evaluates the radial correction scale at a squared tan-angle radius.
    #[must_use]
    pub fn scale_at(&self, radius_squared: f32) -> f32 {
        let k = &self.coefficients;
        match self.equation {
            DistortionEquation::RecipPoly4 => {
                1.0 / (k[0] + radius_squared * (k[1] + radius_squared * (k[2] + radius_squared * k[3])))
            }
            DistortionEquation::CatmullRom10 | DistortionEquation::CatmullRom20 => {
                let samples = self.equation.sample_count();
                #[expect(
                    clippy::cast_precision_loss,
                    reason = "sample counts are at most 21"
                )]
                let scaled = (samples - 1) as f32 * radius_squared
                    / (self.max_radius * self.max_radius);
                eval_catmull_rom(k, scaled, samples)
            }
        }
    }

    /// Evaluates the per-channel correction scales `[red, green, blue]` at a
    /// squared tan-angle radius.
    ///
    /// The chromatic terms bias only the red and blue channels; green is the
    /// base scale.
    #[must_use]
    pub fn chroma_scale_at(&self, radius_squared: f32) -> [f32; 3] {
        let scale = self.scale_at(radius_squared);
        let ca = &self.chromatic_aberration;
        [
            scale * (1.0 + ca[0] + radius_squared * ca[1]),
            scale,
            scale * (1.0 + ca[2] + radius_squared * ca[3]),
        ]
    }
}

/// Evaluates a Catmull-Rom spline at `scaled_val` sample units.
///
/// Boundary segments use one-sided tangent estimates; past the last sample
/// the final segment degenerates to a line, so the curve extrapolates
/// linearly with the final slope.
fn eval_catmull_rom(k: &[f32], scaled_val: f32, samples: usize) -> f32 {
    #[expect(clippy::cast_precision_loss, reason = "sample counts are at most 21")]
    let floor = scaled_val.floor().clamp(0.0, (samples - 1) as f32);
    let t = scaled_val - floor;
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "floor is clamped to [0, samples-1] above"
    )]
    let seg = floor as usize;

    let (p0, m0, p1, m1) = if seg == 0 {
        (k[0], k[1] - k[0], k[1], 0.5 * (k[2] - k[0]))
    } else if seg < samples - 2 {
        (
            k[seg],
            0.5 * (k[seg + 1] - k[seg - 1]),
            k[seg + 1],
            0.5 * (k[seg + 2] - k[seg]),
        )
    } else if seg == samples - 2 {
        (
            k[seg],
            0.5 * (k[seg + 1] - k[seg - 1]),
            k[seg + 1],
            k[seg + 1] - k[seg],
        )
    } else {
        let p0 = k[seg];
        let m0 = k[seg] - k[seg - 1];
        (p0, m0, p0 + m0, m0)
    };

    let omt = 1.0 - t;
    (p0 * (1.0 + 2.0 * t) + m0 * t) * omt * omt
        + (p1 * (1.0 + 2.0 * omt) - m1 * omt) * t * t
}

/// Physical screen and holder geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenGeometry {
    /// Screen width in meters.
    pub width_meters: f32,
    /// Screen height in meters.
    pub height_meters: f32,
    /// Screen width in pixels.
    pub width_pixels: u32,
    /// Screen height in pixels.
    pub height_pixels: u32,
    /// Horizontal offset of the screen center from the holder center, in
    /// meters.
    pub horizontal_offset_meters: f32,
    /// Distance between the holder's lens centers, in meters.
    pub lens_separation_meters: f32,
}

/// The phone-in-holder combinations with calibrated profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceModel {
    /// Galaxy S4 in the original holder.
    GalaxyS4,
    /// Galaxy S5 1080p with version 2 lenses.
    GalaxyS5,
    /// Galaxy S5 1440p with version 2 lenses.
    GalaxyS5Wqhd,
    /// Note 4. Also the fallback for unknown models.
    Note4,
}

impl DeviceModel {
    /// Matches a hardware model string against the calibration table.
    ///
    /// Unknown models report as [`Self::Note4`].
    #[must_use]
    pub fn identify(build_model: &str) -> Self {
        if build_model == "GT-I9506" {
            Self::GalaxyS4
        } else if build_model == "SM-G900F" || build_model == "SM-G900X" {
            Self::GalaxyS5
        } else if build_model == "SM-G906S" {
            Self::GalaxyS5Wqhd
        } else if build_model.contains("SM-N910") || build_model.contains("SM-N916") {
            Self::Note4
        } else {
            Self::Note4
        }
    }
}

/// Full optical calibration for one device, selected once at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceOpticalProfile {
    /// Which device this profile calibrates.
    pub model: DeviceModel,
    /// Lens correction parameters.
    pub lens: LensProfile,
    /// Screen and holder geometry.
    pub screen: ScreenGeometry,
    /// Native display refresh rate in Hz.
    pub display_refresh_hz: f32,
    /// Suggested per-eye field of view in degrees (horizontal, vertical).
    pub eye_fov_degrees: [f32; 2],
}

/// Default chromatic aberration terms shared by every shipped holder.
const DEFAULT_CHROMATIC: [f32; 4] = [-0.006, 0.0, 0.014, 0.0];

fn coefficients<const N: usize>(values: [f32; N]) -> [f32; MAX_COEFFICIENTS] {
    let mut table = [0.0; MAX_COEFFICIENTS];
    table[..N].copy_from_slice(&values);
    table
}

impl DeviceOpticalProfile {
    /// Looks up the profile for a hardware model string.
    ///
    /// Unmatched models fall back to the Note 4 calibration; callers that
    /// care can compare [`DeviceOpticalProfile::model`] against
    /// [`DeviceModel::identify`]'s result to log the miss.
    #[must_use]
    pub fn for_model(build_model: &str) -> Self {
        Self::for_device(DeviceModel::identify(build_model))
    }

    /// Returns the calibration for a known device.
    #[must_use]
    pub fn for_device(model: DeviceModel) -> Self {
        match model {
            DeviceModel::GalaxyS4 => Self {
                model,
                lens: LensProfile {
                    equation: DistortionEquation::RecipPoly4,
                    coefficients: coefficients([0.756, -0.266, -0.389, 0.158]),
                    max_radius: 1.0,
                    chromatic_aberration: DEFAULT_CHROMATIC,
                    meters_per_tan_angle: 0.043875,
                },
                screen: ScreenGeometry {
                    width_meters: 0.1106,
                    height_meters: 0.0622,
                    width_pixels: 1920,
                    height_pixels: 1080,
                    horizontal_offset_meters: 0.0,
                    lens_separation_meters: 0.062,
                },
                display_refresh_hz: 60.0,
                eye_fov_degrees: [95.0, 95.0],
            },
            DeviceModel::GalaxyS5 => Self {
                model,
                lens: galaxy_s5_lens(),
                screen: ScreenGeometry {
                    width_meters: 0.1129,
                    height_meters: 0.0635,
                    width_pixels: 1920,
                    height_pixels: 1080,
                    horizontal_offset_meters: 0.0,
                    lens_separation_meters: 0.062,
                },
                display_refresh_hz: 60.0,
                eye_fov_degrees: [90.0, 90.0],
            },
            DeviceModel::GalaxyS5Wqhd => Self {
                model,
                lens: galaxy_s5_lens(),
                screen: ScreenGeometry {
                    width_meters: 0.1129,
                    height_meters: 0.0635,
                    width_pixels: 2560,
                    height_pixels: 1440,
                    horizontal_offset_meters: 0.0,
                    lens_separation_meters: 0.062,
                },
                display_refresh_hz: 60.0,
                eye_fov_degrees: [90.0, 90.0],
            },
            DeviceModel::Note4 => Self {
                model,
                lens: LensProfile {
                    equation: DistortionEquation::CatmullRom10,
                    coefficients: coefficients([
                        1.0, 1.029, 1.0565, 1.088, 1.127, 1.175, 1.232, 1.298, 1.375, 1.464,
                        1.570,
                    ]),
                    max_radius: 1.0,
                    chromatic_aberration: DEFAULT_CHROMATIC,
                    meters_per_tan_angle: 0.0365,
                },
                screen: ScreenGeometry {
                    // Not reported correctly by display metrics; measured.
                    width_meters: 0.125,
                    height_meters: 0.0707,
                    width_pixels: 2560,
                    height_pixels: 1440,
                    horizontal_offset_meters: 0.0,
                    lens_separation_meters: 0.063,
                },
                display_refresh_hz: 60.0,
                eye_fov_degrees: [90.0, 90.0],
            },
        }
    }
}

fn galaxy_s5_lens() -> LensProfile {
    LensProfile {
        equation: DistortionEquation::CatmullRom10,
        coefficients: coefficients([
            1.0, 1.021, 1.051, 1.086, 1.128, 1.177, 1.232, 1.295, 1.368, 1.452, 1.560,
        ]),
        max_radius: 1.0,
        chromatic_aberration: DEFAULT_CHROMATIC,
        meters_per_tan_angle: 0.037,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note4_model_strings() {
        assert_eq!(DeviceModel::identify("SM-N9100"), DeviceModel::Note4);
        assert_eq!(DeviceModel::identify("SM-N916S"), DeviceModel::Note4);
    }

    #[test]
    fn known_model_strings() {
        assert_eq!(DeviceModel::identify("GT-I9506"), DeviceModel::GalaxyS4);
        assert_eq!(DeviceModel::identify("SM-G900F"), DeviceModel::GalaxyS5);
        assert_eq!(DeviceModel::identify("SM-G900X"), DeviceModel::GalaxyS5);
        assert_eq!(DeviceModel::identify("SM-G906S"), DeviceModel::GalaxyS5Wqhd);
    }

    #[test]
    fn unknown_model_falls_back_to_note4() {
        let profile = DeviceOpticalProfile::for_model("Pixel 9");
        assert_eq!(profile.model, DeviceModel::Note4);
        assert_eq!(profile.lens.meters_per_tan_angle, 0.0365);
    }

    #[test]
    fn spline_identity_at_zero_radius() {
        let profile = DeviceOpticalProfile::for_device(DeviceModel::Note4);
        let scale = profile.lens.scale_at(0.0);
        assert_eq!(scale, 1.0, "spline value at r²=0 is K[0]");
    }

    #[test]
    fn note4_scale_at_max_radius() {
        let lens = DeviceOpticalProfile::for_device(DeviceModel::Note4).lens;
        let max_rsq = lens.max_radius * lens.max_radius;
        let scale = lens.scale_at(max_rsq);
        assert!(
            (scale - 1.570).abs() < 1e-6,
            "scale at MaxR² must be the last table entry, got {scale}"
        );
    }

    #[test]
    fn spline_is_monotonic_for_note4() {
        let lens = DeviceOpticalProfile::for_device(DeviceModel::Note4).lens;
        let mut previous = lens.scale_at(0.0);
        for i in 1_u16..=100 {
            let rsq = f32::from(i) / 100.0;
            let scale = lens.scale_at(rsq);
            assert!(
                scale >= previous,
                "pincushion correction must grow with radius (r²={rsq})"
            );
            previous = scale;
        }
    }

    #[test]
    fn spline_extrapolates_linearly_past_max() {
        let lens = DeviceOpticalProfile::for_device(DeviceModel::Note4).lens;
        let k = &lens.coefficients;
        let last_slope = k[10] - k[9];
        // One full sample step past the end of the table.
        let rsq = 1.1;
        let expected = k[10] + last_slope;
        let scale = lens.scale_at(rsq);
        assert!(
            (scale - expected).abs() < 1e-5,
            "expected linear extrapolation {expected}, got {scale}"
        );
    }

    #[test]
    fn recip_poly_scale() {
        let lens = DeviceOpticalProfile::for_device(DeviceModel::GalaxyS4).lens;
        let k = &lens.coefficients;
        assert!((lens.scale_at(0.0) - 1.0 / k[0]).abs() < 1e-6);
        let rsq = 0.5;
        let expected = 1.0 / (k[0] + rsq * (k[1] + rsq * (k[2] + rsq * k[3])));
        assert!((lens.scale_at(rsq) - expected).abs() < 1e-6);
    }

    #[test]
    fn chroma_biases_red_and_blue_only() {
        let lens = DeviceOpticalProfile::for_device(DeviceModel::Note4).lens;
        let rsq = 0.25;
        let [red, green, blue] = lens.chroma_scale_at(rsq);
        let base = lens.scale_at(rsq);
        assert_eq!(green, base, "green is the reference channel");
        assert!(red < green, "red bias is negative for these holders");
        assert!(blue > green, "blue bias is positive for these holders");
    }
}
