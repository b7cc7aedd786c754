use super::Collector;
use crate::error::CollectorError;
use crate::samples::Timestamp;
use crate::sources::{FieldMap, PlatformFieldSource};
use crate::summary::{Summary, SummaryValue};
use chrono::Utc;
use log::debug;
use serde::Serialize;

const MM_PER_INCH: f64 = 25.4;

/// Pixel density at which one density-independent pixel equals one pixel
const BASELINE_DPI: f64 = 160.0;

/// Screen size bucket by density-independent dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Normal,
    Large,
    XLarge,
    Undefined,
}

impl SizeCategory {
    /// Bucket a `width_px` x `height_px` screen at `density_dpi`
    ///
    /// Thresholds are on the long and short sides in density-independent
    /// pixels: xlarge from 960x720, large from 640x480, normal from 470x320.
    pub fn classify(width_px: i64, height_px: i64, density_dpi: Option<u32>) -> Self {
        let Some(density) = density_dpi.filter(|d| *d > 0) else {
            return SizeCategory::Undefined;
        };
        let to_dp = |px: i64| px as f64 * BASELINE_DPI / f64::from(density);
        let long = to_dp(width_px.max(height_px));
        let short = to_dp(width_px.min(height_px));

        if long >= 960.0 && short >= 720.0 {
            SizeCategory::XLarge
        } else if long >= 640.0 && short >= 480.0 {
            SizeCategory::Large
        } else if long >= 470.0 && short >= 320.0 {
            SizeCategory::Normal
        } else {
            SizeCategory::Small
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeCategory::Small => "Small",
            SizeCategory::Normal => "Normal",
            SizeCategory::Large => "Large",
            SizeCategory::XLarge => "XLarge",
            SizeCategory::Undefined => "Undefined",
        }
    }
}

/// Display snapshot from one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub polled_at: Timestamp,
    pub connector: Option<String>,
    pub width_px: i64,
    pub height_px: i64,
    pub width_mm: Option<i64>,
    pub height_mm: Option<i64>,
}

impl DisplayState {
    /// Pixels per inch along the horizontal axis
    pub fn xdpi(&self) -> Option<f64> {
        dpi(self.width_px, self.width_mm)
    }

    pub fn ydpi(&self) -> Option<f64> {
        dpi(self.height_px, self.height_mm)
    }

    /// Mean of both axes, rounded
    pub fn density_dpi(&self) -> Option<u32> {
        let (x, y) = (self.xdpi()?, self.ydpi()?);
        Some(((x + y) / 2.0).round() as u32)
    }

    pub fn size_category(&self) -> SizeCategory {
        SizeCategory::classify(self.width_px, self.height_px, self.density_dpi())
    }
}

fn dpi(pixels: i64, millimetres: Option<i64>) -> Option<f64> {
    let mm = millimetres.filter(|mm| *mm > 0)?;
    Some(pixels as f64 / (mm as f64 / MM_PER_INCH))
}

/// Display collector over a platform field source
pub struct DisplayCollector {
    source: Box<dyn PlatformFieldSource>,
    state: Option<DisplayState>,
}

impl DisplayCollector {
    pub fn new(source: Box<dyn PlatformFieldSource>) -> Self {
        Self {
            source,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&DisplayState> {
        self.state.as_ref()
    }

    pub fn density_dpi(&self) -> Option<u32> {
        self.state.as_ref().and_then(DisplayState::density_dpi)
    }

    fn state_from(fields: &FieldMap) -> Option<DisplayState> {
        Some(DisplayState {
            polled_at: Utc::now(),
            connector: fields.get_text("connector").map(str::to_string),
            width_px: fields.get_i64("width_px")?,
            height_px: fields.get_i64("height_px")?,
            width_mm: fields.get_i64("width_mm"),
            height_mm: fields.get_i64("height_mm"),
        })
    }
}

impl Collector for DisplayCollector {
    fn name(&self) -> &str {
        "display"
    }

    fn poll(&mut self) -> Result<(), CollectorError> {
        let fields = self.source.read()?;
        let state = Self::state_from(&fields)
            .ok_or_else(|| CollectorError::Unrecognized("display".to_string()))?;
        debug!(
            "Display: {}x{} density={:?}",
            state.width_px,
            state.height_px,
            state.density_dpi()
        );
        self.state = Some(state);
        Ok(())
    }

    fn summary(&self) -> Summary {
        let summary = Summary::new("Display Information", self.state.as_ref().map(|s| s.polled_at));
        let Some(state) = &self.state else {
            return summary
                .entry("Density", SummaryValue::Unknown)
                .entry("Size Category", SummaryValue::Unknown)
                .entry("Width", SummaryValue::Unknown)
                .entry("Height", SummaryValue::Unknown)
                .entry("x Dpi", SummaryValue::Unknown)
                .entry("y Dpi", SummaryValue::Unknown);
        };

        let number = |value: Option<f64>| value.map_or(SummaryValue::Unknown, SummaryValue::Number);
        summary
            .entry("Density", number(state.density_dpi().map(f64::from)))
            .entry(
                "Size Category",
                SummaryValue::Text(state.size_category().label().to_string()),
            )
            .entry("Width", SummaryValue::Text(format!("{} pixels", state.width_px)))
            .entry("Height", SummaryValue::Text(format!("{} pixels", state.height_px)))
            .entry("x Dpi", number(state.xdpi().map(|d| (d * 10.0).round() / 10.0)))
            .entry("y Dpi", number(state.ydpi().map(|d| (d * 10.0).round() / 10.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockPlatformFieldSource;

    fn collector(reads: Vec<Result<FieldMap, CollectorError>>) -> DisplayCollector {
        let mut source = MockPlatformFieldSource::new();
        let mut reads = reads.into_iter();
        source
            .expect_read()
            .returning(move || reads.next().unwrap_or_else(|| Ok(FieldMap::new())));
        DisplayCollector::new(Box::new(source))
    }

    fn laptop_panel() -> FieldMap {
        // 13.3" 2560x1600 panel, 286x179 mm
        FieldMap::new()
            .with("connector", "card0-eDP-1")
            .with("width_px", 2560i64)
            .with("height_px", 1600i64)
            .with("width_mm", 286i64)
            .with("height_mm", 179i64)
    }

    #[test]
    fn test_poll_laptop_panel() {
        let mut display = collector(vec![Ok(laptop_panel())]);
        display.poll().unwrap();

        let state = display.state().unwrap();
        assert!((state.xdpi().unwrap() - 227.4).abs() < 0.1);
        assert!((state.ydpi().unwrap() - 227.0).abs() < 0.1);
        assert_eq!(display.density_dpi(), Some(227));
        assert_eq!(state.size_category(), SizeCategory::XLarge);

        let summary = display.summary();
        assert_eq!(summary.get("Density"), Some(&SummaryValue::Number(227.0)));
        assert_eq!(
            summary.get("Width"),
            Some(&SummaryValue::Text("2560 pixels".to_string()))
        );
        assert_eq!(
            summary.get("Size Category"),
            Some(&SummaryValue::Text("XLarge".to_string()))
        );
    }

    #[test]
    fn test_unknown_physical_size() {
        let fields = FieldMap::new()
            .with("width_px", 1920i64)
            .with("height_px", 1080i64);
        let mut display = collector(vec![Ok(fields)]);
        display.poll().unwrap();

        assert_eq!(display.density_dpi(), None);
        let summary = display.summary();
        assert_eq!(summary.get("Density"), Some(&SummaryValue::Unknown));
        assert_eq!(summary.get("x Dpi"), Some(&SummaryValue::Unknown));
        assert_eq!(
            summary.get("Size Category"),
            Some(&SummaryValue::Text("Undefined".to_string()))
        );
    }

    #[test]
    fn test_size_categories() {
        assert_eq!(SizeCategory::classify(1080, 1920, Some(480)), SizeCategory::Normal);
        assert_eq!(SizeCategory::classify(1200, 1920, Some(240)), SizeCategory::XLarge);
        assert_eq!(SizeCategory::classify(800, 1280, Some(240)), SizeCategory::Large);
        assert_eq!(SizeCategory::classify(240, 320, Some(160)), SizeCategory::Small);
        assert_eq!(SizeCategory::classify(1920, 1080, Some(0)), SizeCategory::Undefined);
        assert_eq!(SizeCategory::classify(1920, 1080, None), SizeCategory::Undefined);
    }

    #[test]
    fn test_missing_resolution_is_unrecognized_and_keeps_state() {
        let mut display = collector(vec![
            Ok(laptop_panel()),
            Ok(FieldMap::new().with("connector", "card0-eDP-1")),
            Err(CollectorError::acquisition("drm", "no connected display")),
        ]);
        display.poll().unwrap();
        let before = display.summary();

        assert!(matches!(display.poll(), Err(CollectorError::Unrecognized(_))));
        assert!(matches!(display.poll(), Err(CollectorError::Acquisition { .. })));
        assert_eq!(display.summary(), before);
        assert!(display.history().is_none());
    }

    #[test]
    fn test_summary_before_first_poll() {
        let display = collector(vec![]);
        let summary = display.summary();
        assert!(summary.polled_at.is_none());
        assert_eq!(summary.entries.len(), 6);
        assert!(summary.entries.iter().all(|e| e.value.is_unknown()));
    }
}
