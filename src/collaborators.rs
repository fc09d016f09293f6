//! External contracts consumed, not implemented, by the core (`spec.md` §6).
//!
//! `Material` and `Model` are answered by application code; the core only ever
//! reads through these traits. Equation implementations (mass/energy balance,
//! emissions) are out of scope — see `spec.md` §1, Non-goals.

/// One of the two kinds of change a [`Material`] may report through
/// [`Material::material_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialChangeKind {
    Contents,
    Temperature,
}

/// A material instance, consumed only as data (`spec.md` §6, "Material
/// collaborator"). The core never mutates one — it is read for mass/energy
/// bookkeeping external to this crate.
pub trait Material {
    fn mass(&self) -> f64;
    fn volume(&self) -> f64;
    fn temperature(&self) -> f64;
    fn specific_heat(&self) -> f64;
    fn latent_heat_of_vaporization(&self) -> f64;
    fn molecular_weight(&self) -> f64;

    /// Registers a listener notified of [`MaterialChangeKind`] events. The default
    /// no-op is appropriate for materials whose contents/temperature never change
    /// during a single execution.
    fn on_material_changed(&self, _listener: Box<dyn Fn(MaterialChangeKind)>) {}
}

/// GUID under which a modeled object is registered with a [`Model`].
pub type Guid = String;

/// The modeling host this core reports into (`spec.md` §6, "Model (provided
/// externally)"). Warnings and errors raised here never unwind the firing
/// engine — see `spec.md` §7, "Propagation policy".
pub trait Model {
    fn register(&self, guid: Guid, description: &str);
    fn add_warning(&self, warning: String);
    fn add_error(&self, error: String);
}
