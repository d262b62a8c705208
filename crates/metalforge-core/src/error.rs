use thiserror::Error;

// ── Parameter errors ──────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Unknown option '{0}' (not present in the component's default options)")]
    UnknownOption(String),

    #[error("Option '{option}': cannot parse '{value}' as a number")]
    InvalidNumber { option: String, value: String },

    #[error("Option '{option}': unrecognized unit '{unit}' in '{value}'")]
    UnknownUnit {
        option: String,
        value: String,
        unit: String,
    },

    #[error("Option '{option}': circular variable reference {}", chain.join(" -> "))]
    CircularVariable { option: String, chain: Vec<String> },

    #[error("Option '{0}' is missing from the parsed parameters")]
    Missing(String),

    #[error("Option '{option}': expected {expected}, found {found}")]
    WrongType {
        option: String,
        expected: &'static str,
        found: String,
    },
}

// ── Geometry errors ───────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Rectangle dimensions must be positive, got {width} x {height}")]
    NonPositiveDimension { width: f64, height: f64 },

    #[error("Line endpoints coincide at ({x}, {y})")]
    DegenerateLine { x: f64, y: f64 },

    #[error("Pin '{pin}': width must be positive, got {width}")]
    NonPositiveWidth { pin: String, width: f64 },

    #[error("Pin '{pin}': {reason}")]
    DegeneratePin { pin: String, reason: String },
}

// ── Registration errors ───────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Element '{0}' is already registered by this component")]
    DuplicateElement(String),

    #[error("Pin '{0}' is already registered by this component")]
    DuplicatePin(String),

    #[error("A component named '{0}' already exists in the design")]
    DuplicateComponent(String),

    #[error("Component '{0}' not found in the design")]
    UnknownComponent(String),

    #[error("Component '{component}' has no pin '{pin}'")]
    UnknownPin { component: String, pin: String },

    #[error("Pin '{component}.{pin}' is already connected to net {net_id}")]
    PinAlreadyConnected {
        component: String,
        pin: String,
        net_id: u32,
    },

    #[error("Cannot connect pin '{component}.{pin}' to itself")]
    SelfConnection { component: String, pin: String },

    #[error("Pins '{component}.{a}' and '{component}.{b}' belong to the same component")]
    SameComponent { component: String, a: String, b: String },
}

// ── State errors ──────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Component '{0}' is already built; rebuild it instead of calling make() again")]
    AlreadyBuilt(String),

    #[error("Component '{0}' has not been built yet")]
    NotBuilt(String),
}

// ── Umbrella ──────────────────────────────────────────────────────────

/// Any failure raised while parsing, building or registering a component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    State(#[from] StateError),
}
