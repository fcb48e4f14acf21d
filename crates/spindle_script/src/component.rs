use crate::object::{ObjectId, ScriptObject};

/// Static factory the materializer calls on a script class.
pub const FACTORY_METHOD: &str = "fromNativeEntity";
/// Named argument carrying the owning entity into the factory.
pub const ENTITY_PARAM: &str = "entity";
/// Per-tick method the dispatcher calls.
pub const UPDATE_METHOD: &str = "update";

/// Attaches script behaviour to an entity.
///
/// Either names a module and class to be materialized when the component is
/// attached (native-origin), or carries an object the script already created
/// (script-origin). Once an object is set it is never replaced.
#[derive(Debug, Default)]
pub struct ScriptComponent {
    pub(crate) script_object: Option<ScriptObject>,
    pub module: String,
    pub class: String,
    pub args: Vec<serde_json::Value>,
}

impl ScriptComponent {
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            script_object: None,
            module: module.into(),
            class: class.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional constructor argument.
    pub fn arg(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<serde_json::Value>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Wrap an object that already exists in the interpreter.
    pub fn from_object(object: ScriptObject) -> Self {
        Self {
            script_object: Some(object),
            ..Self::default()
        }
    }

    pub fn object(&self) -> Option<&ScriptObject> {
        self.script_object.as_ref()
    }

    pub fn object_id(&self) -> Option<ObjectId> {
        self.script_object.as_ref().map(ScriptObject::id)
    }

    pub fn is_materialized(&self) -> bool {
        self.script_object.is_some()
    }

    /// Set the object unless one is already present. Returns the rejected
    /// object when the slot was taken.
    pub(crate) fn set_object(&mut self, object: ScriptObject) -> Result<(), ScriptObject> {
        match self.script_object {
            Some(_) => Err(object),
            None => {
                self.script_object = Some(object);
                Ok(())
            }
        }
    }
}

/// Build a [`ScriptComponent`] naming a module and class, with optional
/// positional constructor arguments.
///
/// ```ignore
/// entity.assign(script_component!("game.enemy", "Grunt", 4.0, 5.0))?;
/// ```
#[macro_export]
macro_rules! script_component {
    ($module:expr, $class:expr $(, $arg:expr)* $(,)?) => {
        $crate::ScriptComponent::new($module, $class)$(.arg($arg))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn macro_collects_arguments_in_order() {
        let component = script_component!("fixtures.constructor_test", "ConstructorTest", 4.0, 5.0);
        assert_eq!(component.module, "fixtures.constructor_test");
        assert_eq!(component.class, "ConstructorTest");
        assert_eq!(component.args, vec![json!(4.0), json!(5.0)]);
        assert!(!component.is_materialized());
    }

    #[test]
    fn mixed_argument_types() {
        let component = ScriptComponent::new("m", "C")
            .arg("name")
            .arg(true)
            .with_args([1, 2]);
        assert_eq!(component.args, vec![json!("name"), json!(true), json!(1), json!(2)]);
    }

    #[test]
    fn object_is_set_once() {
        let mut component = ScriptComponent::new("m", "C");
        assert!(component.set_object(ScriptObject::new(ObjectId(1))).is_ok());
        let rejected = component.set_object(ScriptObject::new(ObjectId(2)));
        assert_eq!(rejected.map_err(|object| object.id()), Err(ObjectId(2)));
        assert_eq!(component.object_id(), Some(ObjectId(1)));
    }
}
