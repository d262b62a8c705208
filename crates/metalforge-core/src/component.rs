use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ComponentError, ParameterError, StateError};
use crate::geometry::BBox;
use crate::params::{self, OptionTemplate, Options, ParamValue, ParsedParameters};
use crate::registry::{
    ElementRegistry, Pin, PinRegistry, Registrations, DEFAULT_CHIP, DEFAULT_PIN_GAP_RATIO,
};

/// Unique component instance identifier.
pub type ComponentId = Uuid;

/// A parametric geometry generator.
///
/// Implementors are stateless: all per-instance data lives in [`Component`].
pub trait Buildable: std::fmt::Debug + Send {
    /// Type name used in exports, e.g. `"Rectangle"`.
    fn component_type(&self) -> &'static str;

    /// Prefix for automatically generated instance names.
    fn short_name(&self) -> &'static str {
        "component"
    }

    /// A fresh copy of the type's default options.
    fn default_options(&self) -> OptionTemplate;

    /// Build geometry from `p` and submit it to `out`.
    fn make(&self, p: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError>;
}

/// Environment a component is parsed and built in.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub variables: Option<&'a Options>,
    /// Chip for pins when the component has no `chip` option.
    pub default_chip: &'a str,
    pub pin_gap_ratio: f64,
}

impl Default for BuildContext<'static> {
    fn default() -> Self {
        Self {
            variables: None,
            default_chip: DEFAULT_CHIP,
            pin_gap_ratio: DEFAULT_PIN_GAP_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    Unbuilt,
    Built,
}

/// A parsed and built rebuild waiting to be applied.
#[derive(Debug)]
pub(crate) struct PreparedRebuild {
    options: Options,
    parsed: ParsedParameters,
    default_chip: String,
    pin_gap_ratio: f64,
    registrations: Registrations,
}

/// One instance of a [`Buildable`] with its own options and geometry.
#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    name: String,
    builder: Box<dyn Buildable>,
    options: Options,
    parsed: ParsedParameters,
    state: BuildState,
    registrations: Registrations,
    default_chip: String,
    pin_gap_ratio: f64,
}

impl Component {
    /// Create an unbuilt instance with default context.
    pub fn new(
        name: &str,
        builder: Box<dyn Buildable>,
        overrides: Option<&Options>,
    ) -> Result<Self, ComponentError> {
        Self::new_in(name, builder, overrides, &BuildContext::default())
    }

    /// Create an unbuilt instance, resolving options against `ctx`.
    pub fn new_in(
        name: &str,
        builder: Box<dyn Buildable>,
        overrides: Option<&Options>,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, ComponentError> {
        let options = builder.default_options().merged(overrides)?;
        let parsed = params::resolve(&options, ctx.variables)?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            builder,
            options,
            parsed,
            state: BuildState::Unbuilt,
            registrations: Registrations::new(ctx.default_chip, ctx.pin_gap_ratio),
            default_chip: ctx.default_chip.to_string(),
            pin_gap_ratio: ctx.pin_gap_ratio,
        })
    }

    /// Run the builder once. Geometry becomes visible only if it succeeds.
    pub fn make(&mut self) -> Result<(), ComponentError> {
        if self.state == BuildState::Built {
            return Err(StateError::AlreadyBuilt(self.name.clone()).into());
        }
        let staged = self.stage(&self.parsed, &self.default_chip, self.pin_gap_ratio)?;
        self.commit(staged);
        Ok(())
    }

    fn stage(
        &self,
        parsed: &ParsedParameters,
        default_chip: &str,
        pin_gap_ratio: f64,
    ) -> Result<Registrations, ComponentError> {
        let chip = match parsed.get("chip") {
            Some(ParamValue::Text(chip)) => chip.as_str(),
            _ => default_chip,
        };
        let mut staged = Registrations::new(chip, pin_gap_ratio);

        if let Err(e) = self.builder.make(parsed, &mut staged) {
            log::warn!("Failed to build {} '{}': {}", self.component_type(), self.name, e);
            return Err(e);
        }
        Ok(staged)
    }

    fn commit(&mut self, staged: Registrations) {
        log::info!(
            "Built {} '{}': {} element(s), {} pin(s)",
            self.component_type(),
            self.name,
            staged.elements.len(),
            staged.pins.len()
        );
        self.registrations = staged;
        self.state = BuildState::Built;
    }

    fn reparse(
        &self,
        overrides: Option<&Options>,
        ctx: &BuildContext<'_>,
    ) -> Result<(Options, ParsedParameters), ComponentError> {
        let template = self.builder.default_options();
        let mut options = self.options.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                if !template.contains(key) {
                    return Err(ParameterError::UnknownOption(key.clone()).into());
                }
                options.insert(key.clone(), value.clone());
            }
        }
        let parsed = params::resolve(&options, ctx.variables)?;
        Ok((options, parsed))
    }

    /// Apply `overrides` on top of the current options, drop the previous
    /// geometry and build again.
    ///
    /// A parse failure leaves the instance exactly as it was. A build failure
    /// keeps the new options and leaves the instance unbuilt.
    pub fn rebuild(
        &mut self,
        overrides: Option<&Options>,
        ctx: &BuildContext<'_>,
    ) -> Result<(), ComponentError> {
        let (options, parsed) = self.reparse(overrides, ctx)?;

        self.options = options;
        self.parsed = parsed;
        self.default_chip = ctx.default_chip.to_string();
        self.pin_gap_ratio = ctx.pin_gap_ratio;
        self.registrations = Registrations::new(ctx.default_chip, ctx.pin_gap_ratio);
        self.state = BuildState::Unbuilt;
        self.make()
    }

    /// Parse and build a rebuild without touching the instance.
    pub(crate) fn prepare_rebuild(
        &self,
        overrides: Option<&Options>,
        ctx: &BuildContext<'_>,
    ) -> Result<PreparedRebuild, ComponentError> {
        let (options, parsed) = self.reparse(overrides, ctx)?;
        let registrations = self.stage(&parsed, ctx.default_chip, ctx.pin_gap_ratio)?;
        Ok(PreparedRebuild {
            options,
            parsed,
            default_chip: ctx.default_chip.to_string(),
            pin_gap_ratio: ctx.pin_gap_ratio,
            registrations,
        })
    }

    pub(crate) fn apply_rebuild(&mut self, prepared: PreparedRebuild) {
        self.options = prepared.options;
        self.parsed = prepared.parsed;
        self.default_chip = prepared.default_chip;
        self.pin_gap_ratio = prepared.pin_gap_ratio;
        self.commit(prepared.registrations);
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_type(&self) -> &'static str {
        self.builder.component_type()
    }

    pub fn short_name(&self) -> &'static str {
        self.builder.short_name()
    }

    /// The instance's raw options (defaults merged with overrides).
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn parsed(&self) -> &ParsedParameters {
        &self.parsed
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn is_built(&self) -> bool {
        self.state == BuildState::Built
    }

    pub fn elements(&self) -> &ElementRegistry {
        &self.registrations.elements
    }

    pub fn pins(&self) -> &PinRegistry {
        &self.registrations.pins
    }

    pub fn pin(&self, name: &str) -> Option<&Pin> {
        self.registrations.pins.get(name)
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.registrations.elements.bbox()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GeometryError, RegistrationError};
    use crate::geometry::{line, rectangle, Point, Shape};
    use crate::registry::{ElementKind, ElementOptions};
    use crate::transform::place;

    /// A pad with a pin on its right edge.
    #[derive(Debug)]
    struct Pad;

    impl Buildable for Pad {
        fn component_type(&self) -> &'static str {
            "Pad"
        }

        fn short_name(&self) -> &'static str {
            "pad"
        }

        fn default_options(&self) -> OptionTemplate {
            OptionTemplate::from_pairs(&[
                ("size", "20um"),
                ("pos_x", "0um"),
                ("rotation", "0"),
                ("chip", "main"),
                ("layer", "1"),
            ])
        }

        fn make(&self, p: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError> {
            let size = p.length("size")?;
            let pad = rectangle(size, size, 0.0, 0.0)?;
            let edge = line(Point::new(size / 2.0, -size / 4.0), Point::new(size / 2.0, size / 4.0))?;
            let rot = p.angle("rotation")?;
            let dx = p.length("pos_x")?;
            let pad = place(&pad, rot, dx, 0.0);
            let edge = place(&edge, rot, dx, 0.0);
            out.elements.add_elements(
                ElementKind::Poly,
                [("pad", Shape::from(pad))],
                &ElementOptions {
                    layer: p.unsigned("layer")?,
                    chip: p.text("chip")?.to_string(),
                    ..Default::default()
                },
            )?;
            out.pins.add_pin("out", &edge.points, size / 2.0)?;
            Ok(())
        }
    }

    /// Registers geometry, then fails.
    #[derive(Debug)]
    struct Broken;

    impl Buildable for Broken {
        fn component_type(&self) -> &'static str {
            "Broken"
        }

        fn default_options(&self) -> OptionTemplate {
            OptionTemplate::from_pairs(&[("width", "0um")])
        }

        fn make(&self, p: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError> {
            let ok = rectangle(1.0, 1.0, 0.0, 0.0)?;
            out.elements
                .add_elements(ElementKind::Poly, [("ok", Shape::from(ok))], &ElementOptions::default())?;
            out.pins
                .add_pin("p", &[Point::new(0.0, 0.0), Point::new(0.0, 1.0)], p.length("width")?)?;
            Ok(())
        }
    }

    fn opts(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_make_once() {
        let mut c = Component::new("pad_1", Box::new(Pad), None).unwrap();
        assert_eq!(c.state(), BuildState::Unbuilt);
        assert!(c.elements().is_empty());
        c.make().unwrap();
        assert!(c.is_built());
        assert_eq!(c.elements().len(), 1);
        assert_eq!(c.pins().len(), 1);
        assert_eq!(
            c.make().unwrap_err(),
            ComponentError::State(StateError::AlreadyBuilt("pad_1".into()))
        );
        // The first build is still intact.
        assert_eq!(c.elements().len(), 1);
    }

    #[test]
    fn test_failed_make_commits_nothing() {
        let mut c = Component::new("broken", Box::new(Broken), None).unwrap();
        let err = c.make().unwrap_err();
        assert!(matches!(
            err,
            ComponentError::Geometry(GeometryError::NonPositiveWidth { .. })
        ));
        assert_eq!(c.state(), BuildState::Unbuilt);
        assert!(c.elements().is_empty());
        assert!(c.pins().is_empty());

        // Fixing the option through rebuild succeeds.
        c.rebuild(Some(&opts(&[("width", "2um")])), &BuildContext::default())
            .unwrap();
        assert!(c.is_built());
        assert_eq!(c.pin("p").unwrap().width, 2.0);
    }

    #[test]
    fn test_rebuild_replaces_geometry() {
        let mut c = Component::new("pad_1", Box::new(Pad), None).unwrap();
        c.make().unwrap();
        c.rebuild(Some(&opts(&[("pos_x", "1mm")])), &BuildContext::default())
            .unwrap();
        let bb = c.bbox().unwrap();
        assert!(bb.center().approx_eq(&Point::new(1000.0, 0.0), 1e-9));
        assert_eq!(c.options().get("pos_x").map(String::as_str), Some("1mm"));
        assert_eq!(c.elements().len(), 1);
    }

    #[test]
    fn test_rebuild_with_bad_override_keeps_state() {
        let mut c = Component::new("pad_1", Box::new(Pad), None).unwrap();
        c.make().unwrap();
        let err = c
            .rebuild(Some(&opts(&[("colour", "red")])), &BuildContext::default())
            .unwrap_err();
        assert_eq!(
            err,
            ComponentError::Parameter(ParameterError::UnknownOption("colour".into()))
        );
        assert!(c.is_built());
        assert_eq!(c.elements().len(), 1);
    }

    #[test]
    fn test_unknown_override_rejected_at_construction() {
        let err = Component::new("x", Box::new(Pad), Some(&opts(&[("nope", "1")]))).unwrap_err();
        assert_eq!(
            err,
            ComponentError::Parameter(ParameterError::UnknownOption("nope".into()))
        );
    }

    #[test]
    fn test_pin_chip_follows_component_chip() {
        let mut c =
            Component::new("pad_1", Box::new(Pad), Some(&opts(&[("chip", "flip")]))).unwrap();
        c.make().unwrap();
        assert_eq!(c.pin("out").unwrap().chip, "flip");
        assert_eq!(c.elements().get("pad").unwrap().chip, "flip");
    }

    #[test]
    fn test_rotated_pin_axis() {
        let mut c =
            Component::new("pad_1", Box::new(Pad), Some(&opts(&[("rotation", "90")]))).unwrap();
        c.make().unwrap();
        let pin = c.pin("out").unwrap();
        assert!(pin.middle.approx_eq(&Point::new(0.0, 10.0), 1e-9));
        assert!(pin.tangent.approx_eq(&Point::new(-1.0, 0.0), 1e-9));
    }

    #[test]
    fn test_duplicate_registration_surfaces() {
        #[derive(Debug)]
        struct Twice;
        impl Buildable for Twice {
            fn component_type(&self) -> &'static str {
                "Twice"
            }
            fn default_options(&self) -> OptionTemplate {
                OptionTemplate::from_pairs(&[])
            }
            fn make(&self, _: &ParsedParameters, out: &mut Registrations) -> Result<(), ComponentError> {
                let r = rectangle(1.0, 1.0, 0.0, 0.0)?;
                out.elements.add_elements(
                    ElementKind::Poly,
                    [("r", Shape::from(r.clone())), ("r", Shape::from(r))],
                    &ElementOptions::default(),
                )?;
                Ok(())
            }
        }
        let mut c = Component::new("t", Box::new(Twice), None).unwrap();
        assert_eq!(
            c.make().unwrap_err(),
            ComponentError::Registration(RegistrationError::DuplicateElement("r".into()))
        );
        assert!(!c.is_built());
    }
}
