//! Lua scripting.
//!
//! Scripts see one module, `burrow`, available both as a global and through
//! `require("burrow")`. It holds one function per command, registered once
//! at construction, so `burrow.nope` is simply `nil` and scripts can test
//! for a command before calling it.
//!
//! ```lua
//! local burrow = require("burrow")
//! burrow.set("users", "alice", "admin")
//! local role, err = burrow.get("users", "alice")
//! ```
//!
//! Arguments must be strings or numbers; numbers are converted the way
//! Lua's `tostring` would. Anything else raises an error. Strings are passed
//! as raw bytes, so a value may hold any bytes, but a bucket name, key or
//! pattern that is not UTF-8 raises like a bad argument type. Any other
//! failing command does not raise: it returns `nil` and the error message.

use crate::commands::COMMANDS;
use crate::dispatch::Dispatcher;
use crate::error::{ShellError, ShellResult};
use crate::reply::{Field, Reply};
use bytes::Bytes;
use mlua::{FromLuaMulti, Lua, MultiValue, Table, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the command module inside the script VM.
pub const MODULE_NAME: &str = "burrow";

/// A Lua VM with the command set installed.
pub struct ScriptBridge {
    lua: Lua,
    dispatcher: Dispatcher,
}

impl ScriptBridge {
    /// Creates a VM and installs the `burrow` module.
    pub fn new(dispatcher: Dispatcher) -> ShellResult<Self> {
        let lua = Lua::new();
        let module = lua.create_table()?;

        for command in COMMANDS {
            let dispatcher = dispatcher.clone();
            let name = command.name;
            let function = lua.create_function(move |lua, args: MultiValue| {
                let args = marshal_args(lua, args)?;
                let values = match dispatcher.execute(name, &args) {
                    Ok(reply) => vec![reply_to_lua(lua, &reply)?],
                    Err(err @ ShellError::NonUtf8Name(_)) => {
                        return Err(mlua::Error::RuntimeError(err.to_string()))
                    }
                    Err(err) => vec![
                        Value::Nil,
                        Value::String(lua.create_string(err.to_string())?),
                    ],
                };
                Ok(MultiValue::from_vec(values))
            })?;
            module.set(name, function)?;
        }

        let globals = lua.globals();
        globals.set(MODULE_NAME, module.clone())?;
        let loaded: Table = globals.get::<Table>("package")?.get("loaded")?;
        loaded.set(MODULE_NAME, module)?;

        Ok(Self { lua, dispatcher })
    }

    /// Returns the dispatcher commands run through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs a chunk of Lua source.
    pub fn exec(&self, source: &str) -> ShellResult<()> {
        self.lua.load(source).exec()?;
        Ok(())
    }

    /// Evaluates a Lua expression or chunk and converts its result.
    pub fn eval<R: FromLuaMulti>(&self, source: &str) -> ShellResult<R> {
        Ok(self.lua.load(source).eval()?)
    }

    /// Runs a Lua script file.
    pub fn run_file(&self, path: &Path) -> ShellResult<()> {
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(script = %path.display(), "running script");
        self.lua
            .load(source)
            .set_name(format!("@{}", path.display()))
            .exec()?;
        Ok(())
    }
}

fn marshal_args(lua: &Lua, args: MultiValue) -> mlua::Result<Vec<Bytes>> {
    args.into_iter()
        .enumerate()
        .map(|(i, value)| {
            let s = match value {
                Value::String(s) => s,
                Value::Integer(_) | Value::Number(_) => {
                    lua.coerce_string(value)?.ok_or_else(|| bad_arg(i + 1))?
                }
                _ => return Err(bad_arg(i + 1)),
            };
            Ok(Bytes::copy_from_slice(&s.as_bytes()))
        })
        .collect()
}

fn bad_arg(position: usize) -> mlua::Error {
    mlua::Error::RuntimeError(format!(
        "the type of arg {position} is incorrect, only number and string are acceptable"
    ))
}

fn reply_to_lua(lua: &Lua, reply: &Reply) -> mlua::Result<Value> {
    Ok(match reply {
        Reply::Bool(value) => Value::Boolean(*value),
        Reply::Integer(value) => Value::Integer(*value),
        Reply::Bytes(value) => Value::String(lua.create_string(value)?),
        Reply::List(items) => {
            Value::Table(lua.create_sequence_from(items.iter().map(String::as_str))?)
        }
        Reply::Map(fields) => Value::Table(map_to_lua(lua, fields)?),
    })
}

fn map_to_lua(lua: &Lua, fields: &BTreeMap<String, Field>) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (key, field) in fields {
        let value = match field {
            Field::Bytes(value) => Value::String(lua.create_string(value)?),
            Field::Integer(value) => Value::Integer(*value),
            Field::Map(nested) => Value::Table(map_to_lua(lua, nested)?),
        };
        table.raw_set(key.as_str(), value)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::Database;
    use std::sync::Arc;

    fn bridge() -> ScriptBridge {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ScriptBridge::new(Dispatcher::new(db)).unwrap()
    }

    #[test]
    fn unknown_names_are_nil() {
        let bridge = bridge();
        let missing: bool = bridge.eval("return burrow.nope == nil").unwrap();
        let present: bool = bridge.eval("return type(burrow.get) == 'function'").unwrap();
        assert!(missing);
        assert!(present);
    }

    #[test]
    fn require_returns_the_global() {
        let bridge = bridge();
        let same: bool = bridge.eval("return require('burrow') == burrow").unwrap();
        assert!(same);
    }

    #[test]
    fn numbers_are_stringified() {
        let bridge = bridge();
        bridge.exec("burrow.set('n', 1, 2.5)").unwrap();
        let value: String = bridge.eval("return burrow.get('n', '1')").unwrap();
        assert_eq!(value, "2.5");
    }

    #[test]
    fn bad_argument_type_raises() {
        let bridge = bridge();
        let err = bridge.exec("burrow.set('b', {}, 'v')").unwrap_err();
        assert!(err
            .to_string()
            .contains("the type of arg 2 is incorrect, only number and string are acceptable"));
    }

    #[test]
    fn binary_values_keep_their_bytes() {
        let bridge = bridge();
        bridge.exec(r#"burrow.set("bin", "k", "\0\255\128")"#).unwrap();
        let len: i64 = bridge.eval(r#"return #burrow.get("bin", "k")"#).unwrap();
        assert_eq!(len, 3);

        let value = bridge
            .dispatcher()
            .execute("get", &["bin", "k"])
            .unwrap();
        assert_eq!(value, Reply::Bytes(Bytes::from_static(b"\x00\xff\x80")));
    }

    #[test]
    fn non_utf8_keys_raise_and_write_nothing() {
        let bridge = bridge();
        let err = bridge
            .exec(r#"burrow.set("b", "\255", "one")"#)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("arg 2 is not valid UTF-8; bucket names, keys and patterns must be text"));
        assert!(bridge.exec(r#"burrow.set("b", "\254", "two")"#).is_err());

        let stats = bridge.dispatcher().database().stats().unwrap();
        assert_eq!(stats.write_tx_n, 0);
        assert_eq!(stats.log_size, 0);
        let empty: bool = bridge.eval(r#"return #burrow.buckets("*") == 0"#).unwrap();
        assert!(empty);
    }

    #[test]
    fn command_failure_returns_nil_and_message() {
        let bridge = bridge();
        let (value, err): (Value, String) = bridge.eval("return burrow.get('only')").unwrap();
        assert!(value.is_nil());
        assert_eq!(err, "wrong number of arguments for 'get' command");
    }
}
