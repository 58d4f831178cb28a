//! The bundled demo library and the call script run against it.
//!
//! Two modules, `shapes` and `widgets`, are loaded one at a time so that
//! requests for their types can be seen resolving on load.

use serde::Serialize;

use minstrel_core::{
    Arguments, CallError, CallResult, Instance, ModuleDef, TypeRegistry, TypeSpec, Value,
};

/// Demo modules, in load order.
pub fn modules() -> Vec<ModuleDef> {
    vec![shapes(), widgets()]
}

fn shapes() -> ModuleDef {
    ModuleDef::new("shapes")
        .with_type(
            TypeSpec::interface("Shapes::Measurable").method("describe", |this, _| {
                let area = this.call("area", &Arguments::new())?;
                Ok(Value::from(format!(
                    "{} with area {:.2}",
                    this.type_name(),
                    area.as_f64().unwrap_or_default()
                )))
            }),
        )
        .with_type(
            TypeSpec::class("Shapes::Shape")
                .include("Shapes::Measurable")
                .method("area", |this, _| {
                    Err(CallError::raised(
                        "NotImplementedError",
                        format!("{}#area is abstract", this.type_name()),
                    ))
                })
                .static_method("kinds", |_, args| {
                    args.expect_arity(0, "kinds")?;
                    Ok(Value::from(vec!["circle"]))
                }),
        )
        .with_type(
            TypeSpec::class("Shapes::Circle")
                .extends("Shapes::Shape")
                .method("area", |this, _| {
                    let radius = this
                        .get("radius")
                        .and_then(|r| r.as_f64())
                        .unwrap_or(1.0);
                    Ok(Value::from(std::f64::consts::PI * radius * radius))
                })
                .method("resize", |this, args| {
                    args.expect_arity(1, "resize")?;
                    let radius = args.get(0).and_then(Value::as_f64).ok_or_else(|| {
                        CallError::InvalidArgument {
                            method: "resize".to_string(),
                            message: "radius must be a number".to_string(),
                        }
                    })?;
                    this.set("radius", radius);
                    Ok(Value::from(radius))
                }),
        )
}

fn widgets() -> ModuleDef {
    ModuleDef::new("widgets")
        .with_type(
            TypeSpec::class("Widget")
                .method("build", |_, args| {
                    let part = args.get(0).cloned().unwrap_or(Value::Null);
                    let scale = args.named("scale").and_then(Value::as_u64).unwrap_or(1);
                    Ok(Value::from(format!("widget-{part}x{scale}")))
                })
                .method("boom", |_, _| Err(CallError::raised("RuntimeError", "boom")))
                .static_method("create", |ty, args| {
                    let name = args.require_str(0, "create")?;
                    Ok(Value::from(format!("{}({name})", ty.name())))
                }),
        )
        .with_type(
            TypeSpec::class("Widgets::Gauge")
                .extends("Widget")
                .method("read", |this, _| {
                    this.call("build", &Arguments::new().with(42))
                }),
        )
}

/// Result of one scripted call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// The call, as `Type#method(args)` or `Type.method(args)`.
    pub call: String,
    /// What it returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// What it raised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    /// Check whether the call raised.
    pub fn raised(&self) -> bool {
        self.error.is_some()
    }
}

struct Script<'a> {
    registry: &'a TypeRegistry,
    steps: Vec<StepOutcome>,
}

impl Script<'_> {
    fn record(&mut self, call: String, result: CallResult<Value>) {
        let (value, error) = match result {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.to_string())),
        };
        self.steps.push(StepOutcome { call, value, error });
    }

    fn instantiate(&mut self, type_name: &str) -> Option<Instance> {
        match self.registry.resolve(type_name) {
            Some(ty) => Some(ty.instantiate()),
            None => {
                self.record(format!("{type_name}.new"), Err(uninitialized(type_name)));
                None
            }
        }
    }

    fn call(&mut self, receiver: &Instance, method: &str, args: Arguments) {
        let result = receiver.call(method, &args);
        self.record(format!("{}#{method}({args})", receiver.type_name()), result);
    }

    fn call_static(&mut self, type_name: &str, method: &str, args: Arguments) {
        let result = match self.registry.resolve(type_name) {
            Some(ty) => ty.call_static(method, &args),
            None => Err(uninitialized(type_name)),
        };
        self.record(format!("{type_name}.{method}({args})"), result);
    }
}

fn uninitialized(type_name: &str) -> CallError {
    CallError::raised("NameError", format!("uninitialized constant {type_name}"))
}

/// Run the calls that exercise `module`.
pub fn run_script(module: &str, registry: &TypeRegistry) -> Vec<StepOutcome> {
    let mut script = Script {
        registry,
        steps: Vec::new(),
    };

    match module {
        "shapes" => {
            script.call_static("Shapes::Shape", "kinds", Arguments::new());
            if let Some(circle) = script.instantiate("Shapes::Circle") {
                script.call(&circle, "resize", Arguments::new().with(2.0));
                script.call(&circle, "describe", Arguments::new());
            }
            if let Some(shape) = script.instantiate("Shapes::Shape") {
                script.call(&shape, "describe", Arguments::new());
            }
        }
        "widgets" => {
            script.call_static("Widget", "create", Arguments::new().with("knob"));
            if let Some(widget) = script.instantiate("Widget") {
                script.call(&widget, "build", Arguments::new().with(0));
                script.call(
                    &widget,
                    "build",
                    Arguments::new().with(1).with_named("scale", 2),
                );
                script.call(&widget, "boom", Arguments::new());
            }
            if let Some(gauge) = script.instantiate("Widgets::Gauge") {
                script.call(&gauge, "read", Arguments::new());
            }
        }
        _ => {}
    }

    script.steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> TypeRegistry {
        let registry = TypeRegistry::new();
        for module in modules() {
            registry.load(module).unwrap();
        }
        registry
    }

    #[test]
    fn test_modules_load() {
        let registry = loaded();
        assert!(registry.is_loaded("shapes"));
        assert!(registry.is_loaded("widgets"));

        let gauge = registry.resolve("Widgets::Gauge").unwrap();
        assert_eq!(gauge.ancestor_names(), vec!["Widgets::Gauge", "Widget", "Object"]);
    }

    #[test]
    fn test_widget_script() {
        let registry = loaded();
        let steps = run_script("widgets", &registry);

        let calls: Vec<&str> = steps.iter().map(|s| s.call.as_str()).collect();
        assert_eq!(
            calls,
            vec![
                r#"Widget.create(["knob"])"#,
                "Widget#build([0])",
                "Widget#build([1, scale: 2])",
                "Widget#boom([])",
                "Widgets::Gauge#read([])",
            ]
        );
        assert_eq!(steps[2].value, Some(Value::from("widget-1x2")));
        assert_eq!(steps[3].error.as_deref(), Some("RuntimeError: boom"));
        assert_eq!(steps[4].value, Some(Value::from("widget-42x1")));
    }

    #[test]
    fn test_shape_script() {
        let registry = loaded();
        let steps = run_script("shapes", &registry);

        assert_eq!(steps[0].value, Some(Value::from(vec!["circle"])));
        assert_eq!(
            steps[2].value,
            Some(Value::from("Shapes::Circle with area 12.57"))
        );
        assert!(steps[3].raised());
    }

    #[test]
    fn test_script_before_load() {
        let registry = TypeRegistry::new();
        let steps = run_script("widgets", &registry);

        assert!(steps.iter().all(StepOutcome::raised));
        assert_eq!(
            steps[0].error.as_deref(),
            Some("NameError: uninitialized constant Widget")
        );
    }
}
