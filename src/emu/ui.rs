//! The `ui` global: a factory for host-rendered text buffers.
//!
//! The host supplies the factory; scripts create buffers through
//! `ui.createBuffer(name)` and drive them through the bound cursor, size,
//! and print operations. Rendering is entirely the host's concern.

use std::cell::RefCell;

use crate::script::{
    BindingBuilder, BindingRegistry, ConstValue, NativeObject, Param, ScriptContext, ScriptError,
    TypeTag, Value, binding::Call, context::GLOBAL_UI,
};

pub(crate) const UI_TYPE: &str = "UiLibrary";
pub(crate) const TEXT_BUFFER_TYPE: &str = "TextBuffer";

/// A host-rendered text console a script can draw into.
pub trait TextBuffer {
    /// Current cursor column.
    fn get_x(&self) -> u32;
    /// Current cursor row.
    fn get_y(&self) -> u32;
    /// Width in columns.
    fn cols(&self) -> u32;
    /// Height in rows.
    fn rows(&self) -> u32;
    /// Prints text at the cursor, advancing it.
    fn print(&mut self, text: &str);
    /// Clears the buffer contents.
    fn clear(&mut self);
    /// Resizes the buffer.
    fn set_size(&mut self, cols: u32, rows: u32);
    /// Moves the cursor.
    fn move_cursor(&mut self, x: u32, y: u32);
    /// Advances the cursor by a signed column count.
    fn advance(&mut self, adv: i32);
    /// Sets the user-visible name of the buffer.
    fn set_name(&mut self, name: &str);
    /// Called once when the script releases the buffer. The host tears down
    /// whatever widget backs it.
    fn deinit(&mut self) {}
}

/// Host callback producing fresh text buffers.
pub type TextBufferFactory = Box<dyn Fn() -> Box<dyn TextBuffer>>;

struct UiLibrary {
    factory: RefCell<Option<TextBufferFactory>>,
}

type BufferCell = RefCell<Box<dyn TextBuffer>>;

fn this_buffer<'a>(call: &'a Call<'_>) -> Result<&'a BufferCell, ScriptError> {
    call.this::<BufferCell>()
}

fn tb_get_x(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_buffer(call)?.borrow().get_x()))
}

fn tb_get_y(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_buffer(call)?.borrow().get_y()))
}

fn tb_cols(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_buffer(call)?.borrow().cols()))
}

fn tb_rows(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_buffer(call)?.borrow().rows()))
}

fn tb_print(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?.borrow_mut().print(&call.arg_str(0)?);
    Ok(Value::Void)
}

fn tb_clear(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?.borrow_mut().clear();
    Ok(Value::Void)
}

fn tb_set_size(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?
        .borrow_mut()
        .set_size(call.arg_u32(0)?, call.arg_u32(1)?);
    Ok(Value::Void)
}

fn tb_move_cursor(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?
        .borrow_mut()
        .move_cursor(call.arg_u32(0)?, call.arg_u32(1)?);
    Ok(Value::Void)
}

fn tb_advance(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?.borrow_mut().advance(call.arg_i32(0)?);
    Ok(Value::Void)
}

fn tb_set_name(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_buffer(call)?.borrow_mut().set_name(&call.arg_str(0)?);
    Ok(Value::Void)
}

fn text_buffer_deinit(data: &dyn std::any::Any) {
    if let Some(cell) = data.downcast_ref::<BufferCell>() {
        cell.borrow_mut().deinit();
    }
}

fn ensure_text_buffer_binding() {
    BindingRegistry::global().register_if_absent(TEXT_BUFFER_TYPE, || {
        BindingBuilder::new(TEXT_BUFFER_TYPE)
            .method("getX", vec![], tb_get_x)
            .method("getY", vec![], tb_get_y)
            .method("cols", vec![], tb_cols)
            .method("rows", vec![], tb_rows)
            .method(
                "print",
                vec![Param::required("text", TypeTag::String)],
                tb_print,
            )
            .method("clear", vec![], tb_clear)
            .method(
                "setSize",
                vec![
                    Param::required("cols", TypeTag::U32),
                    Param::required("rows", TypeTag::U32),
                ],
                tb_set_size,
            )
            .method(
                "moveCursor",
                vec![
                    Param::required("x", TypeTag::U32),
                    Param::required("y", TypeTag::U32),
                ],
                tb_move_cursor,
            )
            .method(
                "advance",
                vec![Param::required("adv", TypeTag::S32)],
                tb_advance,
            )
            .doc("Set the user-visible name of this buffer")
            .method(
                "setName",
                vec![Param::required("name", TypeTag::String)],
                tb_set_name,
            )
            .deinit(text_buffer_deinit)
            .build()
    });
}

fn ui_create_buffer(call: &Call<'_>) -> Result<Value, ScriptError> {
    let lib = call.this::<UiLibrary>()?;
    let name = call.arg_str(0)?;
    let factory = lib.factory.borrow();
    let Some(factory) = factory.as_ref() else {
        log::warn!(target: "script", "ui.createBuffer called with no buffer factory installed");
        return Ok(Value::Void);
    };
    let mut buffer = factory();
    if !name.is_empty() {
        buffer.set_name(&name);
    }
    ensure_text_buffer_binding();
    Ok(Value::Object(NativeObject::owned(
        TEXT_BUFFER_TYPE,
        RefCell::new(buffer),
    )))
}

fn ensure_ui_binding() {
    BindingRegistry::global().register_if_absent(UI_TYPE, || {
        BindingBuilder::new(UI_TYPE)
            .doc("Create a text buffer with an optional user-visible name")
            .method(
                "createBuffer",
                vec![Param::defaulted("name", TypeTag::String, ConstValue::Str(""))],
                ui_create_buffer,
            )
            .construct(|| {
                NativeObject::owned(
                    UI_TYPE,
                    UiLibrary {
                        factory: RefCell::new(None),
                    },
                )
            })
            .build()
    });
}

/// Installs (or reuses) the `ui` global and wires the host's text-buffer
/// factory into it.
pub fn set_text_buffer_factory(
    context: &mut ScriptContext,
    factory: TextBufferFactory,
) -> Result<(), ScriptError> {
    ensure_ui_binding();
    ensure_text_buffer_binding();
    let value = context.ensure_global(GLOBAL_UI, UI_TYPE)?;
    if let Value::Object(obj) = value {
        if let Some(lib) = obj.downcast_ref::<UiLibrary>() {
            *lib.factory.borrow_mut() = Some(factory);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::script::binding;

    #[derive(Default)]
    struct FakeBuffer {
        x: u32,
        y: u32,
        cols: u32,
        rows: u32,
        name: String,
        contents: String,
        deinits: u32,
    }

    struct SharedFakeBuffer(Rc<RefCell<FakeBuffer>>);

    impl TextBuffer for SharedFakeBuffer {
        fn get_x(&self) -> u32 {
            self.0.borrow().x
        }
        fn get_y(&self) -> u32 {
            self.0.borrow().y
        }
        fn cols(&self) -> u32 {
            self.0.borrow().cols
        }
        fn rows(&self) -> u32 {
            self.0.borrow().rows
        }
        fn print(&mut self, text: &str) {
            let mut buf = self.0.borrow_mut();
            buf.contents.push_str(text);
            buf.x += text.len() as u32;
        }
        fn clear(&mut self) {
            self.0.borrow_mut().contents.clear();
        }
        fn set_size(&mut self, cols: u32, rows: u32) {
            let mut buf = self.0.borrow_mut();
            buf.cols = cols;
            buf.rows = rows;
        }
        fn move_cursor(&mut self, x: u32, y: u32) {
            let mut buf = self.0.borrow_mut();
            buf.x = x;
            buf.y = y;
        }
        fn advance(&mut self, adv: i32) {
            let mut buf = self.0.borrow_mut();
            buf.x = buf.x.saturating_add_signed(adv);
        }
        fn set_name(&mut self, name: &str) {
            self.0.borrow_mut().name = name.to_owned();
        }
        fn deinit(&mut self) {
            self.0.borrow_mut().deinits += 1;
        }
    }

    fn ui_with_factory() -> (ScriptContext, Rc<RefCell<FakeBuffer>>) {
        let mut ctx = ScriptContext::new();
        let state = Rc::new(RefCell::new(FakeBuffer::default()));
        let shared = state.clone();
        set_text_buffer_factory(
            &mut ctx,
            Box::new(move || Box::new(SharedFakeBuffer(shared.clone()))),
        )
        .unwrap();
        (ctx, state)
    }

    fn ui_object(ctx: &ScriptContext) -> NativeObject {
        match ctx.get_global(GLOBAL_UI) {
            Some(Value::Object(obj)) => obj,
            other => panic!("ui global missing: {:?}", other),
        }
    }

    #[test]
    fn test_create_named_buffer_and_print() {
        let (ctx, state) = ui_with_factory();
        let ui = ui_object(&ctx);
        let Ok(Value::Object(buffer)) = binding::invoke(
            &ui,
            "createBuffer",
            &[Value::String("status".into())],
        ) else {
            panic!("createBuffer failed");
        };
        assert_eq!(state.borrow().name, "status");
        binding::invoke(&buffer, "moveCursor", &[Value::U32(2), Value::U32(1)]).unwrap();
        binding::invoke(&buffer, "print", &[Value::String("hi".into())]).unwrap();
        assert_eq!(state.borrow().contents, "hi");
        assert_eq!(
            binding::invoke(&buffer, "getX", &[]),
            Ok(Value::U32(4))
        );
    }

    #[test]
    fn test_default_name_is_left_unset() {
        let (ctx, state) = ui_with_factory();
        let ui = ui_object(&ctx);
        let result = binding::invoke(&ui, "createBuffer", &[]).unwrap();
        assert!(matches!(result, Value::Object(_)));
        assert_eq!(state.borrow().name, "");
    }

    #[test]
    fn test_buffer_deinit_runs_on_release() {
        let (ctx, state) = ui_with_factory();
        let ui = ui_object(&ctx);
        let buffer = binding::invoke(&ui, "createBuffer", &[]).unwrap();
        assert_eq!(state.borrow().deinits, 0);
        drop(buffer);
        assert_eq!(state.borrow().deinits, 1);
    }

    #[test]
    fn test_factory_replaces_in_existing_global() {
        let (mut ctx, _state) = ui_with_factory();
        let before = ui_object(&ctx);
        let replacement = Rc::new(RefCell::new(FakeBuffer::default()));
        let shared = replacement.clone();
        set_text_buffer_factory(
            &mut ctx,
            Box::new(move || Box::new(SharedFakeBuffer(shared.clone()))),
        )
        .unwrap();
        let after = ui_object(&ctx);
        assert!(before.ptr_eq(&after), "ensure_global must reuse the ui object");
        let buffer = binding::invoke(&after, "createBuffer", &[]).unwrap();
        assert_eq!(replacement.borrow().deinits, 0);
        drop(buffer);
    }
}
