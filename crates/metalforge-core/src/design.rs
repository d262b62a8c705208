use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{BuildContext, BuildState, Buildable, Component, ComponentId};
use crate::error::{ComponentError, RegistrationError};
use crate::params::Options;
use crate::geometry::BBox;
use crate::registry::{GeometryElement, Pin, DEFAULT_CHIP, DEFAULT_PIN_GAP_RATIO};

/// Design-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSettings {
    /// Chip used for pins of components that have no `chip` option.
    pub default_chip: String,
    /// Pin gap as a fraction of the pin width, when not given explicitly.
    pub pin_gap_ratio: f64,
    /// Informational: the unit every length is stored in.
    pub canonical_unit: String,
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            default_chip: DEFAULT_CHIP.to_string(),
            pin_gap_ratio: DEFAULT_PIN_GAP_RATIO,
            canonical_unit: "um".to_string(),
        }
    }
}

/// A pin addressed by component name and pin name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub component: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(component: &str, pin: &str) -> Self {
        Self {
            component: component.to_string(),
            pin: pin.to_string(),
        }
    }
}

/// A connection between two pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub id: u32,
    pub a: PinRef,
    pub b: PinRef,
}

/// Owns component instances and the cross-component views over them.
#[derive(Debug)]
pub struct Design {
    /// Unique design identifier.
    pub id: Uuid,
    /// Human-readable design name.
    pub name: String,
    /// Chip and pin defaults handed to every component build.
    pub settings: DesignSettings,
    /// Design variables that option values may name instead of a literal.
    variables: Options,
    /// Component instances in insertion order.
    components: IndexMap<ComponentId, Component>,
    /// Pin-to-pin connections between components.
    nets: Vec<Net>,
    /// Id handed to the next net.
    next_net_id: u32,
}

impl Design {
    pub fn new(name: &str) -> Self {
        Self::with_settings(name, DesignSettings::default())
    }

    pub fn with_settings(name: &str, settings: DesignSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            settings,
            variables: Options::new(),
            components: IndexMap::new(),
            nets: Vec::new(),
            next_net_id: 1,
        }
    }

    fn context(&self) -> BuildContext<'_> {
        BuildContext {
            variables: Some(&self.variables),
            default_chip: &self.settings.default_chip,
            pin_gap_ratio: self.settings.pin_gap_ratio,
        }
    }

    // ── Variables ────────────────────────────────────────────────────

    /// Set a design variable. Built components keep their geometry until
    /// rebuilt.
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    pub fn variables(&self) -> &Options {
        &self.variables
    }

    // ── Component management ─────────────────────────────────────────

    /// Add a component, optionally building it right away.
    ///
    /// Without a name, one is generated from the component's short name
    /// (`term_1`, `term_2`, ...). Nothing is added if parsing or building
    /// fails.
    pub fn add_component(
        &mut self,
        name: Option<&str>,
        builder: Box<dyn Buildable>,
        overrides: Option<&Options>,
        make: bool,
    ) -> Result<ComponentId, ComponentError> {
        let name = match name {
            Some(name) => {
                if self.find_component(name).is_some() {
                    return Err(RegistrationError::DuplicateComponent(name.to_string()).into());
                }
                name.to_string()
            }
            None => self.next_free_name(builder.short_name()),
        };

        let mut component = Component::new_in(&name, builder, overrides, &self.context())?;
        if make {
            component.make()?;
        }

        let id = component.id();
        log::info!("Added {} '{}' to design '{}'", component.component_type(), name, self.name);
        self.components.insert(id, component);
        Ok(id)
    }

    fn next_free_name(&self, prefix: &str) -> String {
        (1..)
            .map(|n| format!("{prefix}_{n}"))
            .find(|candidate| self.find_component(candidate).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Build a component that was added with `make = false`.
    pub fn make_component(&mut self, name: &str) -> Result<(), ComponentError> {
        let id = self.require_id(name)?;
        match self.components.get_mut(&id) {
            Some(component) => component.make(),
            None => Err(RegistrationError::UnknownComponent(name.to_string()).into()),
        }
    }

    /// Rebuild one component with optional new overrides.
    pub fn rebuild_component(
        &mut self,
        name: &str,
        overrides: Option<&Options>,
    ) -> Result<(), ComponentError> {
        let id = self.require_id(name)?;
        let ctx = BuildContext {
            variables: Some(&self.variables),
            default_chip: &self.settings.default_chip,
            pin_gap_ratio: self.settings.pin_gap_ratio,
        };
        let result = match self.components.get_mut(&id) {
            Some(component) => component.rebuild(overrides, &ctx),
            None => Err(RegistrationError::UnknownComponent(name.to_string()).into()),
        };
        self.prune_nets();
        result
    }

    /// Rebuild every component, e.g. after changing design variables.
    ///
    /// All components are parsed and built before any is replaced, so a
    /// failure anywhere leaves the whole design as it was.
    pub fn rebuild_all(&mut self) -> Result<(), ComponentError> {
        let ctx = self.context();
        let prepared = self
            .components
            .values()
            .map(|component| component.prepare_rebuild(None, &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        for (component, prepared) in self.components.values_mut().zip(prepared) {
            component.apply_rebuild(prepared);
        }
        self.prune_nets();
        Ok(())
    }

    /// Give a component a new name. Nets follow the rename.
    pub fn rename_component(
        &mut self,
        id: &ComponentId,
        new_name: &str,
    ) -> Result<(), RegistrationError> {
        let old_name = match self.components.get(id) {
            Some(component) => component.name().to_string(),
            None => return Err(RegistrationError::UnknownComponent(id.to_string())),
        };
        if old_name == new_name {
            return Ok(());
        }
        if self.find_component(new_name).is_some() {
            return Err(RegistrationError::DuplicateComponent(new_name.to_string()));
        }

        if let Some(component) = self.components.get_mut(id) {
            component.set_name(new_name);
        }
        for net in &mut self.nets {
            for end in [&mut net.a, &mut net.b] {
                if end.component == old_name {
                    end.component = new_name.to_string();
                }
            }
        }
        log::info!("Renamed component '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    /// Remove a component and every net touching it.
    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        let id = self.find_component(name)?.id();
        self.nets
            .retain(|net| net.a.component != name && net.b.component != name);
        self.components.shift_remove(&id)
    }

    pub fn get_component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.components.values().find(|c| c.name() == name)
    }

    fn require_id(&self, name: &str) -> Result<ComponentId, RegistrationError> {
        self.find_component(name)
            .map(Component::id)
            .ok_or_else(|| RegistrationError::UnknownComponent(name.to_string()))
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.values().map(Component::name).collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn all_components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    // ── Export views ─────────────────────────────────────────────────

    /// Every built element, qualified by its owning component's name.
    pub fn elements(&self) -> impl Iterator<Item = (&str, &GeometryElement)> {
        self.components
            .values()
            .flat_map(|c| c.elements().iter().map(move |e| (c.name(), e)))
    }

    /// Look up a pin for routing.
    pub fn pin(&self, component: &str, pin: &str) -> Result<&Pin, RegistrationError> {
        let owner = self
            .find_component(component)
            .ok_or_else(|| RegistrationError::UnknownComponent(component.to_string()))?;
        owner.pin(pin).ok_or_else(|| RegistrationError::UnknownPin {
            component: component.to_string(),
            pin: pin.to_string(),
        })
    }

    // ── Nets ─────────────────────────────────────────────────────────

    /// Record a net between existing pins of two different components.
    /// Each pin joins at most one net.
    pub fn connect_pins(&mut self, a: PinRef, b: PinRef) -> Result<u32, RegistrationError> {
        if a == b {
            return Err(RegistrationError::SelfConnection {
                component: a.component,
                pin: a.pin,
            });
        }
        if a.component == b.component {
            return Err(RegistrationError::SameComponent {
                component: a.component,
                a: a.pin,
                b: b.pin,
            });
        }
        for end in [&a, &b] {
            self.pin(&end.component, &end.pin)?;
            if let Some(net_id) = self.net_of(end) {
                return Err(RegistrationError::PinAlreadyConnected {
                    component: end.component.clone(),
                    pin: end.pin.clone(),
                    net_id,
                });
            }
        }

        let id = self.next_net_id;
        self.next_net_id += 1;
        log::debug!(
            "Net {}: {}.{} <-> {}.{}",
            id,
            a.component,
            a.pin,
            b.component,
            b.pin
        );
        self.nets.push(Net { id, a, b });
        Ok(id)
    }

    pub fn net_of(&self, pin: &PinRef) -> Option<u32> {
        self.nets
            .iter()
            .find(|net| &net.a == pin || &net.b == pin)
            .map(|net| net.id)
    }

    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    /// Drop nets with an end that no longer resolves to a pin.
    fn prune_nets(&mut self) {
        let nets = std::mem::take(&mut self.nets);
        let (kept, dropped): (Vec<Net>, Vec<Net>) = nets.into_iter().partition(|net| {
            self.pin(&net.a.component, &net.a.pin).is_ok()
                && self.pin(&net.b.component, &net.b.pin).is_ok()
        });
        for net in &dropped {
            log::debug!("Dropped net {}: a pin it joined no longer exists", net.id);
        }
        self.nets = kept;
    }

    // ── Bounds ───────────────────────────────────────────────────────

    /// Bounds of one component's built elements. `Ok(None)` when it has none.
    pub fn component_bounds(&self, name: &str) -> Result<Option<BBox>, RegistrationError> {
        self.find_component(name)
            .map(Component::bbox)
            .ok_or_else(|| RegistrationError::UnknownComponent(name.to_string()))
    }

    /// Bounds of every built element in the design.
    pub fn bounds(&self) -> Option<BBox> {
        self.components
            .values()
            .filter_map(Component::bbox)
            .reduce(|acc, bb| acc.union(&bb))
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn snapshot(&self) -> DesignSnapshot<'_> {
        DesignSnapshot {
            id: self.id,
            name: &self.name,
            settings: &self.settings,
            variables: &self.variables,
            components: self
                .components
                .values()
                .map(|c| ComponentSnapshot {
                    id: c.id(),
                    name: c.name(),
                    component_type: c.component_type(),
                    state: c.state(),
                    options: c.options(),
                    elements: c.elements().iter().collect(),
                    pins: c.pins().iter().collect(),
                })
                .collect(),
            nets: &self.nets,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

/// Serializable view of a design for export backends.
#[derive(Debug, Serialize)]
pub struct DesignSnapshot<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub settings: &'a DesignSettings,
    pub variables: &'a Options,
    pub components: Vec<ComponentSnapshot<'a>>,
    pub nets: &'a [Net],
}

#[derive(Debug, Serialize)]
pub struct ComponentSnapshot<'a> {
    pub id: ComponentId,
    pub name: &'a str,
    pub component_type: &'static str,
    pub state: BuildState,
    pub options: &'a Options,
    pub elements: Vec<&'a GeometryElement>,
    pub pins: Vec<&'a Pin>,
}
