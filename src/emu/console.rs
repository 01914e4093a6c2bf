//! The `console` global: a logger sink for scripts.
//!
//! Messages forward to the host's categorized log output through the `log`
//! facade under the `script` target; the host decides where they end up.

use crate::script::{
    BindingBuilder, BindingRegistry, NativeObject, Param, ScriptContext, ScriptError, TypeTag,
    Value, binding::Call, context::GLOBAL_CONSOLE,
};

pub(crate) const CONSOLE_TYPE: &str = "Console";

struct Console;

fn console_log(call: &Call<'_>) -> Result<Value, ScriptError> {
    log::info!(target: "script", "{}", call.arg_str(0)?);
    Ok(Value::Void)
}

fn console_warn(call: &Call<'_>) -> Result<Value, ScriptError> {
    log::warn!(target: "script", "{}", call.arg_str(0)?);
    Ok(Value::Void)
}

fn console_error(call: &Call<'_>) -> Result<Value, ScriptError> {
    log::error!(target: "script", "{}", call.arg_str(0)?);
    Ok(Value::Void)
}

fn ensure_binding() {
    BindingRegistry::global().register_if_absent(CONSOLE_TYPE, || {
        let msg = || Param::required("msg", TypeTag::String);
        BindingBuilder::new(CONSOLE_TYPE)
            .doc("Print an informational message to the console")
            .method("log", vec![msg()], console_log)
            .doc("Print a warning to the console")
            .method("warn", vec![msg()], console_warn)
            .doc("Print an error to the console")
            .method("error", vec![msg()], console_error)
            .construct(|| NativeObject::owned(CONSOLE_TYPE, Console))
            .build()
    });
}

/// Installs the `console` global.
pub fn attach_console(context: &mut ScriptContext) {
    ensure_binding();
    context.set_global(
        GLOBAL_CONSOLE,
        Value::Object(NativeObject::owned(CONSOLE_TYPE, Console)),
    );
}

/// Removes the `console` global.
pub fn detach_console(context: &mut ScriptContext) {
    context.remove_global(GLOBAL_CONSOLE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::binding;

    #[test]
    fn test_console_global_lifecycle() {
        let mut ctx = ScriptContext::new();
        attach_console(&mut ctx);
        let Some(Value::Object(console)) = ctx.get_global(GLOBAL_CONSOLE) else {
            panic!("console global missing");
        };
        assert_eq!(
            binding::invoke(&console, "log", &[Value::String("hello".into())]),
            Ok(Value::Void)
        );
        detach_console(&mut ctx);
        assert_eq!(ctx.get_global(GLOBAL_CONSOLE), None);
    }

    #[test]
    fn test_console_rejects_non_string() {
        let mut ctx = ScriptContext::new();
        attach_console(&mut ctx);
        let Some(Value::Object(console)) = ctx.get_global(GLOBAL_CONSOLE) else {
            panic!("console global missing");
        };
        assert!(matches!(
            binding::invoke(&console, "warn", &[Value::S32(1)]),
            Err(ScriptError::ArityOrTypeMismatch { .. })
        ));
    }
}
