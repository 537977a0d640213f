use crate::core::SliceId;
use serde::{Deserialize, Serialize};

/// Sizes the host measured after laying the cell out
pub trait ElementMetrics {
    /// Rendered height of the header element, if it is mounted
    fn header_height(&self) -> Option<u32>;

    /// Rendered height of the description element, if it is mounted
    fn description_height(&self) -> Option<u32>;
}

/// Metrics for a cell that has not been laid out yet
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmeasured;

impl ElementMetrics for Unmeasured {
    fn header_height(&self) -> Option<u32> {
        None
    }

    fn description_height(&self) -> Option<u32> {
        None
    }
}

/// Fixed measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasuredElements {
    pub header: Option<u32>,
    pub description: Option<u32>,
}

impl ElementMetrics for MeasuredElements {
    fn header_height(&self) -> Option<u32> {
        self.header
    }

    fn description_height(&self) -> Option<u32> {
        self.description
    }
}

/// Layout constants, see the `cell` section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometrySettings {
    pub width_padding: u32,
    pub default_header_height: u32,
    pub description_padding: u32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            width_padding: 10,
            default_header_height: 30,
            description_padding: 10,
        }
    }
}

/// Space handed to the chart renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGeometry {
    pub width: u32,
    pub height: u32,
    pub header_height: u32,
}

impl GeometrySettings {
    pub fn compute(
        &self,
        widget_width: u32,
        widget_height: u32,
        expanded: bool,
        metrics: &dyn ElementMetrics,
    ) -> CellGeometry {
        let header_height = metrics
            .header_height()
            .unwrap_or(self.default_header_height);
        let description_height = match metrics.description_height() {
            Some(h) if expanded => h + self.description_padding,
            _ => 0,
        };
        CellGeometry {
            width: widget_width.saturating_sub(self.width_padding),
            height: widget_height
                .saturating_sub(header_height)
                .saturating_sub(description_height),
            header_height,
        }
    }
}

pub fn header_id(slice_id: SliceId) -> String {
    format!("header_{slice_id}")
}

pub fn description_id(slice_id: SliceId) -> String {
    format!("description_{slice_id}")
}

pub fn container_id(slice_id: SliceId) -> String {
    format!("slice-container-{slice_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmeasured_cell_uses_default_header() {
        let geo = GeometrySettings::default().compute(400, 300, true, &Unmeasured);
        assert_eq!(
            geo,
            CellGeometry {
                width: 390,
                height: 270,
                header_height: 30
            }
        );
    }

    #[test]
    fn description_only_counts_when_expanded() {
        let metrics = MeasuredElements {
            header: Some(40),
            description: Some(50),
        };
        let settings = GeometrySettings::default();

        assert_eq!(settings.compute(400, 300, false, &metrics).height, 260);
        assert_eq!(settings.compute(400, 300, true, &metrics).height, 200);
    }

    #[test]
    fn tiny_widgets_do_not_underflow() {
        let geo = GeometrySettings::default().compute(5, 10, false, &Unmeasured);
        assert_eq!(geo.width, 0);
        assert_eq!(geo.height, 0);
    }

    #[test]
    fn element_ids_follow_slice_id() {
        let id = SliceId::new(42);
        assert_eq!(header_id(id), "header_42");
        assert_eq!(description_id(id), "description_42");
        assert_eq!(container_id(id), "slice-container-42");
    }
}
