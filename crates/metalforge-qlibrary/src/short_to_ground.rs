use metalforge_core::geometry::{line, Point};
use metalforge_core::transform::place;
use metalforge_core::{Buildable, ComponentError, OptionTemplate, ParsedParameters, Registrations};

/// Default connector options.
///
/// * `width`: width of the line terminating to ground, passed on to the pin
/// * `pos_x`, `pos_y`: position of the termination
/// * `orientation`: direction of the termination; 0 is +x, counter-clockwise
///   positive (90 is +y)
/// * `chip`: chip the pin is on
/// * `layer`: layer of the pin; no geometric effect
pub const DEFAULT_OPTIONS: &[(&str, &str)] = &[
    ("width", "10um"),
    ("pos_x", "0um"),
    ("pos_y", "0um"),
    ("orientation", "0"),
    ("chip", "main"),
    ("layer", "1"),
];

/// A short to ground. Draws nothing; exposes a single pin `short` that
/// routed lines can terminate on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortToGround;

impl Buildable for ShortToGround {
    fn component_type(&self) -> &'static str {
        "ShortToGround"
    }

    fn short_name(&self) -> &'static str {
        "term"
    }

    fn default_options(&self) -> OptionTemplate {
        OptionTemplate::from_pairs(DEFAULT_OPTIONS)
    }

    fn make(&self, p: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError> {
        let width = p.length("width")?;

        let port_line = line(Point::new(0.0, -width / 2.0), Point::new(0.0, width / 2.0))?;
        let port_line = place(
            &port_line,
            p.angle("orientation")?,
            p.length("pos_x")?,
            p.length("pos_y")?,
        );

        out.pins.add_pin("short", &port_line.points, width)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metalforge_core::{Component, GeometryError, Options};

    fn opts(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_pin() {
        let mut c = Component::new("term_1", Box::new(ShortToGround), None).unwrap();
        c.make().unwrap();
        assert!(c.elements().is_empty());
        assert_eq!(c.pins().len(), 1);
        let pin = c.pin("short").unwrap();
        assert_eq!(pin.points, vec![Point::new(0.0, -5.0), Point::new(0.0, 5.0)]);
        assert_eq!(pin.width, 10.0);
        assert_eq!(pin.chip, "main");
    }

    #[test]
    fn test_translated_pin() {
        let overrides = opts(&[("pos_x", "100um"), ("pos_y", "0.05mm"), ("width", "4um")]);
        let mut c = Component::new("t", Box::new(ShortToGround), Some(&overrides)).unwrap();
        c.make().unwrap();
        let pin = c.pin("short").unwrap();
        assert!(pin.points[0].approx_eq(&Point::new(100.0, 48.0), 1e-9));
        assert!(pin.points[1].approx_eq(&Point::new(100.0, 52.0), 1e-9));
        assert!(pin.middle.approx_eq(&Point::new(100.0, 50.0), 1e-9));
    }

    #[test]
    fn test_non_positive_width() {
        let mut c =
            Component::new("t", Box::new(ShortToGround), Some(&opts(&[("width", "0um")])))
                .unwrap();
        // A zero-length axis is rejected before the pin width check.
        assert!(matches!(
            c.make(),
            Err(ComponentError::Geometry(GeometryError::DegenerateLine { .. }))
        ));

        let mut c =
            Component::new("t", Box::new(ShortToGround), Some(&opts(&[("width", "-2um")])))
                .unwrap();
        assert!(matches!(
            c.make(),
            Err(ComponentError::Geometry(GeometryError::NonPositiveWidth { .. }))
        ));
        assert!(c.pins().is_empty());
    }
}
