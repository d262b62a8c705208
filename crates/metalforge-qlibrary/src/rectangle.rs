use metalforge_core::geometry::{rectangle, Shape};
use metalforge_core::transform::place;
use metalforge_core::{
    Buildable, ComponentError, ElementKind, ElementOptions, OptionTemplate, ParsedParameters,
    Registrations,
};

/// Default drawing options.
pub const DEFAULT_OPTIONS: &[(&str, &str)] = &[
    ("width", "500um"),
    ("height", "300um"),
    ("pos_x", "0um"),
    ("pos_y", "0um"),
    ("rotation", "0"),
    ("subtract", "False"),
    ("helper", "False"),
    ("chip", "main"),
    ("layer", "1"),
];

/// A single configurable rectangle, rotated about its own center.
///
/// Registers one polygon named `rectangle`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectangle;

impl Buildable for Rectangle {
    fn component_type(&self) -> &'static str {
        "Rectangle"
    }

    fn short_name(&self) -> &'static str {
        "rect"
    }

    fn default_options(&self) -> OptionTemplate {
        OptionTemplate::from_pairs(DEFAULT_OPTIONS)
    }

    fn make(&self, p: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError> {
        let rect = rectangle(p.length("width")?, p.length("height")?, 0.0, 0.0)?;
        let rect = place(
            &rect,
            p.angle("rotation")?,
            p.length("pos_x")?,
            p.length("pos_y")?,
        );

        let options = ElementOptions {
            subtract: p.flag("subtract")?,
            helper: p.flag("helper")?,
            layer: p.unsigned("layer")?,
            chip: p.text("chip")?.to_string(),
            width: None,
        };
        out.elements
            .add_elements(ElementKind::Poly, [("rectangle", Shape::from(rect))], &options)?;
        Ok(())
    }
}
