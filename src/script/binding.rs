//! Declarative method/field bindings for native types.
//!
//! Each native type exposed to scripts registers one [`Binding`]: its
//! methods (with per-parameter type tags, trailing defaults, and
//! docstrings), its fields, and optional deinit/cast/construct hooks. A
//! binding is built once through [`BindingBuilder`], registered into the
//! process-wide [`BindingRegistry`], and never mutated afterwards; the
//! registry is therefore safe to read from any thread even though the
//! values flowing through calls are single-threaded.
//!
//! Docstrings are metadata only. They never affect dispatch and are
//! preserved verbatim in [`BindingRegistry::export_docs`] for documentation
//! tooling.

use std::{
    any::Any,
    collections::HashMap,
    rc::Rc,
    sync::{Arc, OnceLock, RwLock},
};

use crate::script::{
    error::ScriptError,
    object::NativeObject,
    value::{TypeTag, Value},
};

/// Native entry point of a bound method.
pub type MethodFn = fn(&Call<'_>) -> Result<Value, ScriptError>;

/// Getter of a bound field.
pub type FieldFn = fn(&NativeObject) -> Value;

/// Deinit hook, run once when the last owned handle to an object drops.
pub type DeinitFn = fn(&dyn Any);

/// Cast-to-member hook: re-exposes a contained type's own bound surface.
pub type CastFn = fn(&NativeObject) -> Option<NativeObject>;

/// Default constructor used by `ensure_global`.
pub type ConstructFn = fn() -> NativeObject;

/// Compile-time constant usable as a parameter default.
///
/// Defaults live in the process-wide registry, so they are restricted to
/// `Sync` scalar constants rather than arbitrary [`Value`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    /// Signed 32-bit default.
    S32(i32),
    /// Unsigned 32-bit default.
    U32(u32),
    /// Signed 64-bit default.
    S64(i64),
    /// Float default.
    F64(f64),
    /// Boolean default.
    Bool(bool),
    /// String default.
    Str(&'static str),
}

impl ConstValue {
    /// Materializes the constant as a value.
    pub fn to_value(self) -> Value {
        match self {
            Self::S32(v) => Value::S32(v),
            Self::U32(v) => Value::U32(v),
            Self::S64(v) => Value::S64(v),
            Self::F64(v) => Value::F64(v),
            Self::Bool(v) => Value::Bool(v),
            Self::Str(v) => Value::String(v.into()),
        }
    }
}

/// Declared parameter of a bound method.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    name: &'static str,
    tag: TypeTag,
    default: Option<ConstValue>,
}

impl Param {
    /// A parameter the caller must supply.
    pub fn required(name: &'static str, tag: TypeTag) -> Self {
        Self {
            name,
            tag,
            default: None,
        }
    }

    /// A trailing parameter filled from `default` when omitted.
    pub fn defaulted(name: &'static str, tag: TypeTag, default: ConstValue) -> Self {
        Self {
            name,
            tag,
            default: Some(default),
        }
    }

    /// Declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }
}

#[derive(Debug)]
struct Method {
    name: &'static str,
    doc: &'static str,
    params: Vec<Param>,
    func: MethodFn,
}

#[derive(Debug)]
struct Field {
    name: &'static str,
    doc: &'static str,
    func: FieldFn,
}

/// Immutable method/field descriptor of one native type.
pub struct Binding {
    type_name: &'static str,
    methods: Vec<Method>,
    fields: Vec<Field>,
    deinit: Option<DeinitFn>,
    cast: Option<CastFn>,
    construct: Option<ConstructFn>,
}

impl Binding {
    /// Name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Names of the bound methods, in declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> {
        self.methods.iter().map(|m| m.name)
    }

    fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for a [`Binding`]. `doc` applies to the next `method` or `field`.
pub struct BindingBuilder {
    binding: Binding,
    pending_doc: Option<&'static str>,
}

impl BindingBuilder {
    /// Starts describing `type_name`.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            binding: Binding {
                type_name,
                methods: Vec::new(),
                fields: Vec::new(),
                deinit: None,
                cast: None,
                construct: None,
            },
            pending_doc: None,
        }
    }

    /// Attaches a docstring to the next method or field.
    pub fn doc(mut self, doc: &'static str) -> Self {
        self.pending_doc = Some(doc);
        self
    }

    /// Declares a method. Panics on a duplicate name or on a required
    /// parameter following a defaulted one; both are startup programming
    /// errors.
    pub fn method(mut self, name: &'static str, params: Vec<Param>, func: MethodFn) -> Self {
        assert!(
            self.binding.method(name).is_none() && self.binding.field(name).is_none(),
            "duplicate member `{}` on `{}`",
            name,
            self.binding.type_name
        );
        let mut seen_default = false;
        for param in &params {
            if param.default.is_some() {
                seen_default = true;
            } else {
                assert!(
                    !seen_default,
                    "required parameter `{}` after a defaulted one in `{}.{}`",
                    param.name, self.binding.type_name, name
                );
            }
        }
        let doc = self.pending_doc.take().unwrap_or("");
        self.binding.methods.push(Method {
            name,
            doc,
            params,
            func,
        });
        self
    }

    /// Declares a field getter. Panics on a duplicate name.
    pub fn field(mut self, name: &'static str, func: FieldFn) -> Self {
        assert!(
            self.binding.method(name).is_none() && self.binding.field(name).is_none(),
            "duplicate member `{}` on `{}`",
            name,
            self.binding.type_name
        );
        let doc = self.pending_doc.take().unwrap_or("");
        self.binding.fields.push(Field { name, doc, func });
        self
    }

    /// Declares the deinit hook.
    pub fn deinit(mut self, func: DeinitFn) -> Self {
        self.binding.deinit = Some(func);
        self
    }

    /// Declares the cast-to-member hook. Names that resolve to neither a
    /// method nor a field fall through to the cast target's binding.
    pub fn cast(mut self, func: CastFn) -> Self {
        self.binding.cast = Some(func);
        self
    }

    /// Declares the default constructor used by `ensure_global`.
    pub fn construct(mut self, func: ConstructFn) -> Self {
        self.binding.construct = Some(func);
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> Binding {
        self.binding
    }

    /// Finishes the descriptor and registers it globally.
    pub fn register(self) {
        BindingRegistry::global().register(self.build());
    }
}

/// Process-wide registry of type bindings.
pub struct BindingRegistry {
    types: RwLock<HashMap<&'static str, Arc<Binding>>>,
}

impl BindingRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static Self {
        static REGISTRY: OnceLock<BindingRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| Self {
            types: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a binding. Panics if the type name is already taken;
    /// descriptors are immutable once registered.
    pub fn register(&self, binding: Binding) {
        let mut types = self.types.write().expect("binding registry poisoned");
        let name = binding.type_name;
        let prior = types.insert(name, Arc::new(binding));
        assert!(prior.is_none(), "type `{}` registered twice", name);
    }

    /// Registers the binding produced by `build` unless the type is already
    /// present. Used by modules that install their bindings on first use.
    pub fn register_if_absent(&self, type_name: &'static str, build: impl FnOnce() -> Binding) {
        let mut types = self.types.write().expect("binding registry poisoned");
        if !types.contains_key(type_name) {
            let binding = build();
            assert_eq!(binding.type_name, type_name, "binding name mismatch");
            types.insert(type_name, Arc::new(binding));
        }
    }

    /// Looks up the descriptor for a type name.
    pub fn describe(&self, type_name: &str) -> Option<Arc<Binding>> {
        self.types
            .read()
            .expect("binding registry poisoned")
            .get(type_name)
            .cloned()
    }

    /// Deinit hook of a type, if declared.
    pub fn deinit_of(&self, type_name: &str) -> Option<DeinitFn> {
        self.describe(type_name)?.deinit
    }

    /// Constructs the default instance of a type, for `ensure_global`.
    pub fn construct(&self, type_name: &str) -> Result<NativeObject, ScriptError> {
        let construct = self
            .describe(type_name)
            .and_then(|b| b.construct)
            .ok_or_else(|| ScriptError::UnknownType {
                type_name: type_name.to_owned(),
            })?;
        Ok(construct())
    }

    /// Exports every registered type's methods, parameters, defaults, and
    /// docstrings as JSON, sorted by type name.
    pub fn export_docs(&self) -> serde_json::Value {
        #[derive(serde::Serialize)]
        struct ParamDocs {
            name: &'static str,
            tag: &'static str,
            default: Option<String>,
        }
        #[derive(serde::Serialize)]
        struct MethodDocs {
            name: &'static str,
            doc: &'static str,
            params: Vec<ParamDocs>,
        }
        #[derive(serde::Serialize)]
        struct FieldDocs {
            name: &'static str,
            doc: &'static str,
        }
        #[derive(serde::Serialize)]
        struct TypeDocs {
            type_name: &'static str,
            methods: Vec<MethodDocs>,
            fields: Vec<FieldDocs>,
        }

        let types = self.types.read().expect("binding registry poisoned");
        let mut docs: Vec<TypeDocs> = types
            .values()
            .map(|binding| TypeDocs {
                type_name: binding.type_name,
                methods: binding
                    .methods
                    .iter()
                    .map(|m| MethodDocs {
                        name: m.name,
                        doc: m.doc,
                        params: m
                            .params
                            .iter()
                            .map(|p| ParamDocs {
                                name: p.name,
                                tag: p.tag.name(),
                                default: p.default.map(|d| d.to_value().to_string()),
                            })
                            .collect(),
                    })
                    .collect(),
                fields: binding
                    .fields
                    .iter()
                    .map(|f| FieldDocs {
                        name: f.name,
                        doc: f.doc,
                    })
                    .collect(),
            })
            .collect();
        docs.sort_by_key(|t| t.type_name);
        serde_json::to_value(docs).expect("doc export serialization")
    }
}

/// One resolved method invocation: the receiver plus fully coerced
/// arguments. Entry points read their arguments through the typed
/// accessors, which only fail if the binding declaration itself is wrong.
pub struct Call<'a> {
    object: &'a NativeObject,
    type_name: &'static str,
    method: &'static str,
    args: &'a [Value],
}

impl Call<'_> {
    /// The receiver object.
    pub fn object(&self) -> &NativeObject {
        self.object
    }

    /// Downcasts the receiver's native struct.
    pub fn this<T: 'static>(&self) -> Result<&T, ScriptError> {
        self.object
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch("receiver has the wrong native type".to_owned()))
    }

    /// Number of arguments after default filling.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` when the call carries no arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw argument access.
    pub fn arg(&self, index: usize) -> &Value {
        &self.args[index]
    }

    /// Argument as `u8`.
    pub fn arg_u8(&self, index: usize) -> Result<u8, ScriptError> {
        match self.args.get(index) {
            Some(Value::U8(v)) => Ok(*v),
            other => Err(self.bad_arg(index, TypeTag::U8, other)),
        }
    }

    /// Argument as `u16`.
    pub fn arg_u16(&self, index: usize) -> Result<u16, ScriptError> {
        match self.args.get(index) {
            Some(Value::U16(v)) => Ok(*v),
            other => Err(self.bad_arg(index, TypeTag::U16, other)),
        }
    }

    /// Argument as `u32`.
    pub fn arg_u32(&self, index: usize) -> Result<u32, ScriptError> {
        match self.args.get(index) {
            Some(Value::U32(v)) => Ok(*v),
            other => Err(self.bad_arg(index, TypeTag::U32, other)),
        }
    }

    /// Argument as `i32`.
    pub fn arg_i32(&self, index: usize) -> Result<i32, ScriptError> {
        match self.args.get(index) {
            Some(Value::S32(v)) => Ok(*v),
            other => Err(self.bad_arg(index, TypeTag::S32, other)),
        }
    }

    /// Argument as a string.
    pub fn arg_str(&self, index: usize) -> Result<Rc<str>, ScriptError> {
        match self.args.get(index) {
            Some(Value::String(v)) => Ok(v.clone()),
            other => Err(self.bad_arg(index, TypeTag::String, other)),
        }
    }

    fn bad_arg(&self, index: usize, expected: TypeTag, got: Option<&Value>) -> ScriptError {
        self.mismatch(format!(
            "argument {} expects {}, got {}",
            index,
            expected,
            got.map_or("nothing", |v| v.type_name())
        ))
    }

    fn mismatch(&self, detail: String) -> ScriptError {
        ScriptError::ArityOrTypeMismatch {
            type_name: self.type_name,
            method: self.method,
            detail,
        }
    }
}

/// Method bound to a specific object; the payload of [`Value::Function`].
#[derive(Clone)]
pub struct BoundMethod {
    object: NativeObject,
    method: &'static str,
}

impl BoundMethod {
    /// Binds `method` to `object`.
    pub fn new(object: NativeObject, method: &'static str) -> Self {
        Self { object, method }
    }

    /// The receiver.
    pub fn object(&self) -> &NativeObject {
        &self.object
    }

    /// The method name.
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Invokes the method.
    pub fn call(&self, args: &[Value]) -> Result<Value, ScriptError> {
        invoke(&self.object, self.method, args)
    }
}

impl std::fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundMethod({}.{})", self.object.type_name(), self.method)
    }
}

impl PartialEq for BoundMethod {
    fn eq(&self, other: &Self) -> bool {
        self.object.ptr_eq(&other.object) && self.method == other.method
    }
}

/// Resolves `method` on `object`, applies trailing defaults, type-checks
/// every argument, and calls the native entry point.
pub fn invoke(object: &NativeObject, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let binding = BindingRegistry::global()
        .describe(object.type_name())
        .ok_or_else(|| ScriptError::UnknownType {
            type_name: object.type_name().to_owned(),
        })?;
    if let Some(m) = binding.method(method) {
        return dispatch(&binding, m, object, args);
    }
    if let Some(cast) = binding.cast {
        if let Some(target) = cast(object) {
            return invoke(&target, method, args);
        }
    }
    Err(ScriptError::NoSuchMethodOrField {
        type_name: object.type_name(),
        name: method.to_owned(),
    })
}

/// Resolves `name` on `object`: fields yield their current value, methods
/// yield a callable bound to `object`, anything else falls through the
/// cast-to-member hook.
pub fn get(object: &NativeObject, name: &str) -> Result<Value, ScriptError> {
    let binding = BindingRegistry::global()
        .describe(object.type_name())
        .ok_or_else(|| ScriptError::UnknownType {
            type_name: object.type_name().to_owned(),
        })?;
    if let Some(field) = binding.field(name) {
        return Ok((field.func)(object));
    }
    if let Some(m) = binding.method(name) {
        return Ok(Value::Function(Rc::new(BoundMethod::new(
            object.clone(),
            m.name,
        ))));
    }
    if let Some(cast) = binding.cast {
        if let Some(target) = cast(object) {
            return get(&target, name);
        }
    }
    Err(ScriptError::NoSuchMethodOrField {
        type_name: object.type_name(),
        name: name.to_owned(),
    })
}

fn dispatch(
    binding: &Binding,
    m: &Method,
    object: &NativeObject,
    args: &[Value],
) -> Result<Value, ScriptError> {
    let mismatch = |detail: String| ScriptError::ArityOrTypeMismatch {
        type_name: binding.type_name,
        method: m.name,
        detail,
    };
    if args.len() > m.params.len() {
        return Err(mismatch(format!(
            "expected at most {} arguments, got {}",
            m.params.len(),
            args.len()
        )));
    }
    let mut full = Vec::with_capacity(m.params.len());
    for (i, param) in m.params.iter().enumerate() {
        if i < args.len() {
            let coerced = args[i].coerce(param.tag).ok_or_else(|| {
                mismatch(format!(
                    "parameter `{}` expects {}, got {}",
                    param.name,
                    param.tag,
                    args[i].type_name()
                ))
            })?;
            full.push(coerced);
        } else if let Some(default) = param.default {
            full.push(default.to_value());
        } else {
            return Err(mismatch(format!(
                "missing required parameter `{}`",
                param.name
            )));
        }
    }
    let call = Call {
        object,
        type_name: binding.type_name,
        method: m.name,
        args: &full,
    };
    (m.func)(&call)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Counter {
        value: Cell<i32>,
    }

    fn counter_add(call: &Call<'_>) -> Result<Value, ScriptError> {
        let counter = call.this::<Counter>()?;
        let amount = call.arg_i32(0)?;
        counter.value.set(counter.value.get() + amount);
        Ok(Value::S32(counter.value.get()))
    }

    fn counter_value(obj: &NativeObject) -> Value {
        match obj.downcast_ref::<Counter>() {
            Some(counter) => Value::S32(counter.value.get()),
            None => Value::Void,
        }
    }

    fn register_counter() {
        BindingRegistry::global().register_if_absent("test.Counter", || {
            BindingBuilder::new("test.Counter")
                .doc("Add an amount to the counter")
                .method(
                    "add",
                    vec![Param::defaulted("amount", TypeTag::S32, ConstValue::S32(1))],
                    counter_add,
                )
                .field("value", counter_value)
                .construct(|| {
                    NativeObject::owned(
                        "test.Counter",
                        Counter {
                            value: Cell::new(0),
                        },
                    )
                })
                .build()
        });
    }

    fn counter_object(start: i32) -> NativeObject {
        register_counter();
        NativeObject::owned(
            "test.Counter",
            Counter {
                value: Cell::new(start),
            },
        )
    }

    #[test]
    fn test_invoke_with_explicit_argument() {
        let obj = counter_object(10);
        assert_eq!(invoke(&obj, "add", &[Value::S32(5)]), Ok(Value::S32(15)));
    }

    #[test]
    fn test_invoke_applies_trailing_default() {
        let obj = counter_object(0);
        assert_eq!(invoke(&obj, "add", &[]), Ok(Value::S32(1)));
    }

    #[test]
    fn test_invoke_coerces_integer_widths() {
        let obj = counter_object(0);
        assert_eq!(invoke(&obj, "add", &[Value::U8(3)]), Ok(Value::S32(3)));
    }

    #[test]
    fn test_invoke_unknown_method() {
        let obj = counter_object(0);
        assert_eq!(
            invoke(&obj, "subtract", &[]),
            Err(ScriptError::NoSuchMethodOrField {
                type_name: "test.Counter",
                name: "subtract".to_owned(),
            })
        );
    }

    #[test]
    fn test_invoke_rejects_bad_argument_type() {
        let obj = counter_object(0);
        let err = invoke(&obj, "add", &[Value::String("five".into())]);
        assert!(matches!(
            err,
            Err(ScriptError::ArityOrTypeMismatch { method: "add", .. })
        ));
    }

    #[test]
    fn test_invoke_rejects_extra_arguments() {
        let obj = counter_object(0);
        let err = invoke(&obj, "add", &[Value::S32(1), Value::S32(2)]);
        assert!(matches!(
            err,
            Err(ScriptError::ArityOrTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_get_field_and_method() {
        let obj = counter_object(9);
        assert_eq!(get(&obj, "value"), Ok(Value::S32(9)));
        let Ok(Value::Function(method)) = get(&obj, "add") else {
            panic!("expected bound method");
        };
        assert_eq!(method.call(&[Value::S32(1)]), Ok(Value::S32(10)));
        assert_eq!(get(&obj, "value"), Ok(Value::S32(10)));
    }

    #[test]
    fn test_docs_export_preserves_docstrings() {
        register_counter();
        let docs = BindingRegistry::global().export_docs();
        let types = docs.as_array().expect("array of types");
        let counter = types
            .iter()
            .find(|t| t["type_name"] == "test.Counter")
            .expect("counter docs");
        assert_eq!(counter["methods"][0]["doc"], "Add an amount to the counter");
        assert_eq!(counter["methods"][0]["params"][0]["default"], "1");
    }

    #[test]
    fn test_ensure_constructible() {
        register_counter();
        let obj = BindingRegistry::global().construct("test.Counter").unwrap();
        assert_eq!(get(&obj, "value"), Ok(Value::S32(0)));
        assert!(
            BindingRegistry::global()
                .construct("test.NoSuchType")
                .is_err()
        );
    }
}
