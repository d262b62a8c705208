//! Per-component stores for named geometry and pins.
//!
//! Both registries are passive: shapes arrive already transformed and are
//! stored as given. Names are unique within one registry, which belongs to a
//! single component instance.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, GeometryError, RegistrationError};
use crate::geometry::{BBox, Point, Shape};

/// A layer number as used by the export backend.
pub type LayerId = u32;

/// Chip assigned when a component does not name one.
pub const DEFAULT_CHIP: &str = "main";

/// Default ratio of a pin's gap to its width.
pub const DEFAULT_PIN_GAP_RATIO: f64 = 0.6;

/// The table an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Filled polygons.
    Poly,
    /// Centerline paths drawn with a width.
    Path,
}

/// Metadata shared by every shape submitted in one `add_elements` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementOptions {
    pub subtract: bool,
    pub helper: bool,
    pub layer: LayerId,
    pub chip: String,
    /// Drawn width, only meaningful for [`ElementKind::Path`].
    pub width: Option<f64>,
}

impl Default for ElementOptions {
    fn default() -> Self {
        Self {
            subtract: false,
            helper: false,
            layer: 1,
            chip: DEFAULT_CHIP.to_string(),
            width: None,
        }
    }
}

/// A named, metadata-tagged shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryElement {
    pub name: String,
    pub kind: ElementKind,
    pub shape: Shape,
    pub subtract: bool,
    pub helper: bool,
    pub layer: LayerId,
    pub chip: String,
    pub width: Option<f64>,
}

impl GeometryElement {
    pub fn bbox(&self) -> Option<BBox> {
        self.shape.bbox()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRegistry {
    elements: IndexMap<String, GeometryElement>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every `(name, shape)` pair under one metadata tuple.
    ///
    /// The call is all-or-nothing: if any name repeats, either inside the
    /// call or against earlier registrations, nothing is stored.
    pub fn add_elements<I, S>(
        &mut self,
        kind: ElementKind,
        shapes: I,
        options: &ElementOptions,
    ) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = (S, Shape)>,
        S: Into<String>,
    {
        let mut batch: IndexMap<String, GeometryElement> = IndexMap::new();
        for (name, shape) in shapes {
            let name = name.into();
            if self.elements.contains_key(&name) || batch.contains_key(&name) {
                return Err(RegistrationError::DuplicateElement(name));
            }
            let element = GeometryElement {
                name: name.clone(),
                kind,
                shape,
                subtract: options.subtract,
                helper: options.helper,
                layer: options.layer,
                chip: options.chip.clone(),
                width: options.width,
            };
            batch.insert(name, element);
        }

        log::debug!(
            "registering {} {:?} element(s) on layer {} ({})",
            batch.len(),
            kind,
            options.layer,
            options.chip
        );
        self.elements.extend(batch);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&GeometryElement> {
        self.elements.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeometryElement> {
        self.elements.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &GeometryElement> {
        self.elements.values().filter(move |e| e.kind == kind)
    }

    pub fn on_layer(&self, layer: LayerId) -> Vec<&GeometryElement> {
        self.elements.values().filter(|e| e.layer == layer).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Bounding box of every registered shape.
    pub fn bbox(&self) -> Option<BBox> {
        self.elements
            .values()
            .filter_map(GeometryElement::bbox)
            .reduce(|acc, bb| acc.union(&bb))
    }
}

/// A named connection point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    /// Connection axis, already in design coordinates.
    pub points: Vec<Point>,
    /// Midpoint of the last two axis points.
    pub middle: Point,
    /// Unit vector along the last axis segment.
    pub tangent: Point,
    /// `tangent` rotated by +90°.
    pub normal: Point,
    pub width: f64,
    pub gap: f64,
    pub chip: String,
}

/// Optional pin metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinOptions {
    pub chip: Option<String>,
    pub gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinRegistry {
    default_chip: String,
    gap_ratio: f64,
    pins: IndexMap<String, Pin>,
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHIP, DEFAULT_PIN_GAP_RATIO)
    }
}

impl PinRegistry {
    pub fn new(default_chip: &str, gap_ratio: f64) -> Self {
        Self {
            default_chip: default_chip.to_string(),
            gap_ratio,
            pins: IndexMap::new(),
        }
    }

    pub fn add_pin(
        &mut self,
        name: &str,
        points: &[Point],
        width: f64,
    ) -> Result<&Pin, ComponentError> {
        self.add_pin_with(name, points, width, PinOptions::default())
    }

    pub fn add_pin_with(
        &mut self,
        name: &str,
        points: &[Point],
        width: f64,
        options: PinOptions,
    ) -> Result<&Pin, ComponentError> {
        if !(width > 0.0) || !width.is_finite() {
            return Err(GeometryError::NonPositiveWidth {
                pin: name.to_string(),
                width,
            }
            .into());
        }
        if self.pins.contains_key(name) {
            return Err(RegistrationError::DuplicatePin(name.to_string()).into());
        }

        let degenerate = |reason: &str| GeometryError::DegeneratePin {
            pin: name.to_string(),
            reason: reason.to_string(),
        };
        let [.., a, b] = points else {
            return Err(degenerate("needs at least two axis points").into());
        };
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(degenerate("axis points must be finite").into());
        }
        let length = a.distance_to(b);
        if length == 0.0 {
            return Err(degenerate("last two axis points coincide").into());
        }

        let tangent = Point::new((b.x - a.x) / length, (b.y - a.y) / length);
        let pin = Pin {
            name: name.to_string(),
            points: points.to_vec(),
            middle: a.midpoint(b),
            tangent,
            normal: Point::new(-tangent.y, tangent.x),
            width,
            gap: options.gap.unwrap_or(width * self.gap_ratio),
            chip: options.chip.unwrap_or_else(|| self.default_chip.clone()),
        };
        log::debug!("registering pin '{}' at ({}, {})", name, pin.middle.x, pin.middle.y);

        let entry = self.pins.entry(name.to_string()).or_insert(pin);
        Ok(&*entry)
    }

    pub fn get(&self, name: &str) -> Option<&Pin> {
        self.pins.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pins.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pin> {
        self.pins.values()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

/// Everything one component instance produced in a single `make()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registrations {
    pub elements: ElementRegistry,
    pub pins: PinRegistry,
}

impl Registrations {
    pub fn new(default_chip: &str, gap_ratio: f64) -> Self {
        Self {
            elements: ElementRegistry::new(),
            pins: PinRegistry::new(default_chip, gap_ratio),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.pins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{line, rectangle};

    fn rect(w: f64) -> Shape {
        rectangle(w, w, 0.0, 0.0).unwrap().into()
    }

    #[test]
    fn test_add_elements_shares_metadata() {
        let mut reg = ElementRegistry::new();
        let opts = ElementOptions {
            subtract: true,
            layer: 3,
            chip: "flip".into(),
            ..Default::default()
        };
        reg.add_elements(ElementKind::Poly, [("a", rect(1.0)), ("b", rect(2.0))], &opts)
            .unwrap();
        assert_eq!(reg.len(), 2);
        for e in reg.iter() {
            assert!(e.subtract);
            assert!(!e.helper);
            assert_eq!(e.layer, 3);
            assert_eq!(e.chip, "flip");
        }
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(reg.on_layer(3).len(), 2);
        assert!(reg.on_layer(1).is_empty());
    }

    #[test]
    fn test_duplicate_in_one_call_is_rejected_atomically() {
        let mut reg = ElementRegistry::new();
        let err = reg
            .add_elements(
                ElementKind::Poly,
                [("a", rect(1.0)), ("b", rect(1.0)), ("a", rect(2.0))],
                &ElementOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateElement("a".into()));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_duplicate_across_calls() {
        let mut reg = ElementRegistry::new();
        let opts = ElementOptions::default();
        reg.add_elements(ElementKind::Poly, [("a", rect(1.0))], &opts)
            .unwrap();
        let path: Shape = line(Point::origin(), Point::new(1.0, 0.0)).unwrap().into();
        assert!(reg.add_elements(ElementKind::Path, [("a", path)], &opts).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_bbox_union() {
        let mut reg = ElementRegistry::new();
        let far: Shape = rectangle(2.0, 2.0, 10.0, 10.0).unwrap().into();
        reg.add_elements(
            ElementKind::Poly,
            [("a", rect(2.0)), ("b", far)],
            &ElementOptions::default(),
        )
        .unwrap();
        let bb = reg.bbox().unwrap();
        assert_eq!(bb.min, Point::new(-1.0, -1.0));
        assert_eq!(bb.max, Point::new(11.0, 11.0));
    }

    #[test]
    fn test_pin_derived_fields() {
        let mut pins = PinRegistry::default();
        let pin = pins
            .add_pin("p", &[Point::new(-35.0, 30.0), Point::new(-35.0, -35.0)], 0.1)
            .unwrap();
        assert!(pin.middle.approx_eq(&Point::new(-35.0, -2.5), 1e-12));
        assert!(pin.tangent.approx_eq(&Point::new(0.0, -1.0), 1e-12));
        assert!(pin.normal.approx_eq(&Point::new(1.0, 0.0), 1e-12));
        assert!((pin.gap - 0.06).abs() < 1e-12);
        assert_eq!(pin.chip, DEFAULT_CHIP);
    }

    #[test]
    fn test_pin_validation() {
        let mut pins = PinRegistry::new("main", 0.6);
        let axis = [Point::new(0.0, -5.0), Point::new(0.0, 5.0)];
        assert!(matches!(
            pins.add_pin("p", &axis, 0.0),
            Err(ComponentError::Geometry(GeometryError::NonPositiveWidth { .. }))
        ));
        assert!(matches!(
            pins.add_pin("p", &axis, -1.0),
            Err(ComponentError::Geometry(GeometryError::NonPositiveWidth { .. }))
        ));
        assert!(matches!(
            pins.add_pin("p", &axis[..1], 1.0),
            Err(ComponentError::Geometry(GeometryError::DegeneratePin { .. }))
        ));
        assert!(matches!(
            pins.add_pin("p", &[axis[0], axis[0]], 1.0),
            Err(ComponentError::Geometry(GeometryError::DegeneratePin { .. }))
        ));
        pins.add_pin("p", &axis, 10.0).unwrap();
        assert_eq!(
            pins.add_pin("p", &axis, 10.0).unwrap_err(),
            ComponentError::Registration(RegistrationError::DuplicatePin("p".into()))
        );
        assert_eq!(pins.len(), 1);
    }

    #[test]
    fn test_pins_and_elements_are_separate_namespaces() {
        let mut regs = Registrations::new("main", 0.6);
        regs.elements
            .add_elements(ElementKind::Poly, [("short", rect(1.0))], &ElementOptions::default())
            .unwrap();
        regs.pins
            .add_pin_with(
                "short",
                &[Point::new(0.0, 0.0), Point::new(0.0, 1.0)],
                1.0,
                PinOptions {
                    chip: Some("flip".into()),
                    gap: Some(0.25),
                },
            )
            .unwrap();
        let pin = regs.pins.get("short").unwrap();
        assert_eq!(pin.chip, "flip");
        assert_eq!(pin.gap, 0.25);
        assert!(regs.elements.get("short").is_some());
    }
}
