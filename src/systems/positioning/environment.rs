//! Runtime environment detection.
//!
//! Everything here is a pure function of the signals handed in: viewport
//! size, an optional screen-orientation angle and the user agent strings.
use bevy::prelude::*;
use enum_map::Enum;
use serde::{Deserialize, Serialize};

use crate::data::layout::Breakpoints;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        let ratio = if height > 0.0 { width / height } else { 0.0 };
        Self {
            width,
            height,
            ratio,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
    Wide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Safari,
    Firefox,
    Edge,
    Opera,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    pub agent: String,
    pub vendor: String,
}

impl UserAgent {
    pub fn new(agent: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            vendor: vendor.into(),
        }
    }
}

/// Raw inputs read from the window and configuration before detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentSignals {
    pub viewport: Viewport,
    pub orientation_angle: Option<f32>,
    pub user_agent: UserAgent,
}

impl EnvironmentSignals {
    pub fn new(viewport: Viewport, user_agent: UserAgent) -> Self {
        Self {
            viewport,
            orientation_angle: None,
            user_agent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub viewport: Viewport,
    pub device: Device,
    pub browser: Browser,
    pub orientation: Orientation,
    pub platform: Device,
}

impl Default for Environment {
    fn default() -> Self {
        detect(&EnvironmentSignals::default(), &Breakpoints::default())
    }
}

pub fn detect(signals: &EnvironmentSignals, breakpoints: &Breakpoints) -> Environment {
    let device = detect_device(signals.viewport.width, breakpoints);
    Environment {
        viewport: signals.viewport,
        device,
        browser: detect_browser(&signals.user_agent),
        orientation: detect_orientation(signals.viewport, signals.orientation_angle),
        platform: device,
    }
}

pub fn detect_device(width: f32, breakpoints: &Breakpoints) -> Device {
    if width <= breakpoints.mobile {
        Device::Mobile
    } else if width <= breakpoints.tablet {
        Device::Tablet
    } else if width <= breakpoints.desktop {
        Device::Desktop
    } else {
        Device::Wide
    }
}

/// Order matters: Edge and Opera also advertise `Chrome` and are only
/// reported when the vendor check for Chrome fails.
pub fn detect_browser(user_agent: &UserAgent) -> Browser {
    let agent = user_agent.agent.as_str();
    let vendor = user_agent.vendor.as_str();

    if agent.contains("Chrome") && vendor.contains("Google Inc") {
        Browser::Chrome
    } else if agent.contains("Safari") && vendor.contains("Apple Computer") {
        Browser::Safari
    } else if agent.contains("Firefox") {
        Browser::Firefox
    } else if agent.contains("Edg") {
        Browser::Edge
    } else if agent.contains("Opera") || agent.contains("OPR") {
        Browser::Opera
    } else {
        Browser::Default
    }
}

pub fn detect_orientation(viewport: Viewport, angle: Option<f32>) -> Orientation {
    match angle {
        Some(angle) => {
            let angle = angle.rem_euclid(360.0);
            if angle == 0.0 || angle == 180.0 {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            }
        }
        None if viewport.width > viewport.height => Orientation::Landscape,
        None => Orientation::Portrait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_follows_breakpoints_inclusively() {
        let breakpoints = Breakpoints::default();
        assert_eq!(detect_device(320.0, &breakpoints), Device::Mobile);
        assert_eq!(detect_device(480.0, &breakpoints), Device::Mobile);
        assert_eq!(detect_device(481.0, &breakpoints), Device::Tablet);
        assert_eq!(detect_device(768.0, &breakpoints), Device::Tablet);
        assert_eq!(detect_device(1024.0, &breakpoints), Device::Desktop);
        assert_eq!(detect_device(1025.0, &breakpoints), Device::Wide);
    }

    #[test]
    fn browser_sniffing_respects_vendor_and_order() {
        let chrome = UserAgent::new(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36",
            "Google Inc.",
        );
        assert_eq!(detect_browser(&chrome), Browser::Chrome);

        let safari = UserAgent::new(
            "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15",
            "Apple Computer, Inc.",
        );
        assert_eq!(detect_browser(&safari), Browser::Safari);

        let firefox = UserAgent::new("Mozilla/5.0 (X11; rv:128.0) Gecko Firefox/128.0", "");
        assert_eq!(detect_browser(&firefox), Browser::Firefox);

        let opera = UserAgent::new("Mozilla/5.0 AppleWebKit Chrome/120 Safari OPR/106", "");
        assert_eq!(detect_browser(&opera), Browser::Opera);

        assert_eq!(detect_browser(&UserAgent::default()), Browser::Default);
    }

    #[test]
    fn edge_without_google_vendor_is_reported_as_edge() {
        let edge = UserAgent::new("Mozilla/5.0 Chrome/126.0 Safari/537.36 Edg/126.0", "");
        assert_eq!(detect_browser(&edge), Browser::Edge);
    }

    #[test]
    fn orientation_prefers_screen_angle_over_aspect() {
        let wide = Viewport::new(1600.0, 900.0);
        assert_eq!(detect_orientation(wide, None), Orientation::Landscape);
        assert_eq!(detect_orientation(wide, Some(0.0)), Orientation::Portrait);
        assert_eq!(detect_orientation(wide, Some(90.0)), Orientation::Landscape);
        assert_eq!(detect_orientation(wide, Some(-180.0)), Orientation::Portrait);

        let tall = Viewport::new(390.0, 844.0);
        assert_eq!(detect_orientation(tall, None), Orientation::Portrait);
    }

    #[test]
    fn platform_mirrors_device() {
        let signals = EnvironmentSignals::new(Viewport::new(700.0, 1000.0), UserAgent::default());
        let environment = detect(&signals, &Breakpoints::default());
        assert_eq!(environment.device, Device::Tablet);
        assert_eq!(environment.platform, environment.device);
        assert!((environment.viewport.ratio - 0.7).abs() < 1e-6);
    }
}
