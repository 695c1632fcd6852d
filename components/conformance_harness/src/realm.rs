//! Per-execution object model for native test bodies
//!
//! Every native execution gets a brand new [`Realm`]. Well-known intrinsics
//! are looked up through [`Realm::intrinsic`] on the realm a body was
//! handed, so nothing a body does can reach another execution.

use core_types::{ErrorKind, ObjectId, PropertyDescriptor, ThrownError, Value};
use std::collections::{BTreeMap, HashMap};

/// `%Object.prototype%`
pub const OBJECT_PROTOTYPE: &str = "%Object.prototype%";
/// `%Function.prototype%`
pub const FUNCTION_PROTOTYPE: &str = "%Function.prototype%";
/// `%Error.prototype%`
pub const ERROR_PROTOTYPE: &str = "%Error.prototype%";

/// Internal state of one object
#[derive(Debug, Clone)]
struct ObjectData {
    class: &'static str,
    prototype: Option<ObjectId>,
    extensible: bool,
    callable: bool,
    constructor: bool,
    properties: Vec<(String, PropertyDescriptor)>,
}

impl ObjectData {
    fn ordinary(prototype: Option<ObjectId>) -> Self {
        Self {
            class: "Object",
            prototype,
            extensible: true,
            callable: false,
            constructor: false,
            properties: Vec::new(),
        }
    }

    fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, desc)| desc)
    }
}

/// A fresh global environment with its own object heap
#[derive(Debug, Clone)]
pub struct Realm {
    objects: Vec<ObjectData>,
    globals: BTreeMap<String, Value>,
    intrinsics: HashMap<&'static str, ObjectId>,
}

impl Realm {
    /// Create a realm with the base prototypes in place
    pub fn new() -> Self {
        let mut realm = Self {
            objects: Vec::new(),
            globals: BTreeMap::new(),
            intrinsics: HashMap::new(),
        };

        let object_prototype = realm.alloc(ObjectData::ordinary(None));
        realm.intrinsics.insert(OBJECT_PROTOTYPE, object_prototype);

        let mut function_prototype = ObjectData::ordinary(Some(object_prototype));
        function_prototype.class = "Function";
        function_prototype.callable = true;
        let function_prototype = realm.alloc(function_prototype);
        realm.intrinsics.insert(FUNCTION_PROTOTYPE, function_prototype);

        let mut error_prototype = ObjectData::ordinary(Some(object_prototype));
        error_prototype.class = "Error";
        let error_prototype = realm.alloc(error_prototype);
        realm.intrinsics.insert(ERROR_PROTOTYPE, error_prototype);

        realm
    }

    fn alloc(&mut self, data: ObjectData) -> ObjectId {
        self.objects.push(data);
        ObjectId(self.objects.len() - 1)
    }

    fn object(&self, id: ObjectId) -> Option<&ObjectData> {
        self.objects.get(id.0)
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut ObjectData, ThrownError> {
        self.objects
            .get_mut(id.0)
            .ok_or_else(|| ThrownError::new(ErrorKind::TypeError, format!("no object #{}", id.0)))
    }

    /// Look up a well-known intrinsic such as `%Function.prototype%`
    pub fn intrinsic(&self, name: &str) -> Option<ObjectId> {
        self.intrinsics.get(name).copied()
    }

    /// Create an ordinary object
    pub fn create_object(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        self.alloc(ObjectData::ordinary(prototype))
    }

    /// Create a built-in function object
    ///
    /// Its prototype is `%Function.prototype%`. Constructors get an own
    /// `prototype` property; plain built-in functions do not.
    pub fn create_function(&mut self, name: &str, length: u32, constructor: bool) -> ObjectId {
        let mut data = ObjectData::ordinary(self.intrinsic(FUNCTION_PROTOTYPE));
        data.class = "Function";
        data.callable = true;
        data.constructor = constructor;
        data.properties.push((
            "length".to_string(),
            PropertyDescriptor::new(Value::Number(f64::from(length)), false, false, true),
        ));
        data.properties.push((
            "name".to_string(),
            PropertyDescriptor::new(Value::from(name), false, false, true),
        ));
        let function = self.alloc(data);

        if constructor {
            let prototype = self.create_object(self.intrinsic(OBJECT_PROTOTYPE));
            if let Some(data) = self.objects.get_mut(function.0) {
                data.properties.push((
                    "prototype".to_string(),
                    PropertyDescriptor::new(Value::Object(prototype), false, false, false),
                ));
            }
        }
        function
    }

    /// Define or redefine an own property
    ///
    /// Fails with a `TypeError` when adding to a non-extensible object or
    /// changing a non-configurable property.
    pub fn define_property(
        &mut self,
        object: ObjectId,
        name: &str,
        desc: PropertyDescriptor,
    ) -> Result<(), ThrownError> {
        let data = self.object_mut(object)?;
        match data.properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) => {
                if !current.configurable && *current != desc {
                    return Err(ThrownError::new(
                        ErrorKind::TypeError,
                        format!("cannot redefine property: {}", name),
                    ));
                }
                *current = desc;
            }
            None => {
                if !data.extensible {
                    return Err(ThrownError::new(
                        ErrorKind::TypeError,
                        format!("cannot define property {}, object is not extensible", name),
                    ));
                }
                data.properties.push((name.to_string(), desc));
            }
        }
        Ok(())
    }

    /// Delete an own property; false when it is non-configurable
    pub fn delete_property(&mut self, object: ObjectId, name: &str) -> bool {
        let Some(data) = self.objects.get_mut(object.0) else {
            return true;
        };
        match data.properties.iter().position(|(key, _)| key == name) {
            Some(index) if data.properties[index].1.configurable => {
                data.properties.remove(index);
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    /// Own property descriptor, if any
    pub fn get_own_property(&self, object: ObjectId, name: &str) -> Option<&PropertyDescriptor> {
        self.object(object)?.property(name)
    }

    /// `Object.prototype.hasOwnProperty`
    pub fn has_own_property(&self, object: ObjectId, name: &str) -> bool {
        self.get_own_property(object, name).is_some()
    }

    /// Property lookup along the prototype chain
    pub fn get(&self, object: ObjectId, name: &str) -> Value {
        let mut current = Some(object);
        while let Some(id) = current {
            let Some(data) = self.object(id) else {
                break;
            };
            if let Some(desc) = data.property(name) {
                return desc.value.clone();
            }
            current = data.prototype;
        }
        Value::Undefined
    }

    /// `Object.getPrototypeOf`
    pub fn get_prototype_of(&self, object: ObjectId) -> Value {
        match self.object(object).and_then(|data| data.prototype) {
            Some(proto) => Value::Object(proto),
            None => Value::Null,
        }
    }

    /// `Object.setPrototypeOf`
    pub fn set_prototype_of(
        &mut self,
        object: ObjectId,
        prototype: Option<ObjectId>,
    ) -> Result<(), ThrownError> {
        let data = self.object_mut(object)?;
        if !data.extensible && data.prototype != prototype {
            return Err(ThrownError::new(
                ErrorKind::TypeError,
                "cannot change the prototype of a non-extensible object",
            ));
        }
        data.prototype = prototype;
        Ok(())
    }

    /// `Object.isExtensible`
    pub fn is_extensible(&self, object: ObjectId) -> bool {
        self.object(object).map(|data| data.extensible).unwrap_or(false)
    }

    /// `Object.preventExtensions`
    pub fn prevent_extensions(&mut self, object: ObjectId) {
        if let Some(data) = self.objects.get_mut(object.0) {
            data.extensible = false;
        }
    }

    /// Whether the object has `[[Call]]`
    pub fn is_callable(&self, object: ObjectId) -> bool {
        self.object(object).map(|data| data.callable).unwrap_or(false)
    }

    /// Whether the object has `[[Construct]]`
    pub fn is_constructor(&self, object: ObjectId) -> bool {
        self.object(object).map(|data| data.constructor).unwrap_or(false)
    }

    /// `Object.prototype.toString.call(value)`
    pub fn to_string_tag(&self, value: &Value) -> String {
        let class = match value {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Object(id) => self.object(*id).map(|data| data.class).unwrap_or("Object"),
        };
        format!("[object {}]", class)
    }

    /// Read a global binding
    pub fn global(&self, name: &str) -> Value {
        self.globals.get(name).cloned().unwrap_or(Value::Undefined)
    }

    /// Create or overwrite a global binding
    pub fn set_global(&mut self, name: &str, value: impl Into<Value>) {
        self.globals.insert(name.to_string(), value.into());
    }

    /// Resolve a dotted path like `"Temporal.ZonedDateTime.from"` from the globals
    pub fn resolve(&self, path: &str) -> Result<Value, ThrownError> {
        let mut parts = path.split('.');
        let head = parts.next().unwrap_or_default();
        let mut value = match self.globals.get(head) {
            Some(value) => value.clone(),
            None => {
                return Err(ThrownError::new(
                    ErrorKind::ReferenceError,
                    format!("{} is not defined", head),
                ))
            }
        };
        for part in parts {
            value = match value {
                Value::Object(id) => self.get(id, part),
                other => {
                    return Err(ThrownError::new(
                        ErrorKind::TypeError,
                        format!("cannot read property '{}' of {}", part, other),
                    ))
                }
            };
        }
        Ok(value)
    }

    /// Number of objects allocated in this realm
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
