//! Command Cache — component **C6**.
//!
//! A bounded, recency-ordered table of "recipes": templated tool-call
//! sequences keyed by intent. A cache hit lets the orchestrator skip the
//! model entirely for requests shaped like ones it has already handled.

use ib_domain::{ActionTemplate, Recipe, ToolAction, ToolInput};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::intent::{Params, GENERIC};

pub struct CommandCache {
    capacity: usize,
    max_actions_per_recipe: usize,
    recipes: Mutex<IndexMap<String, Recipe>>,
}

impl CommandCache {
    pub fn new(capacity: usize, max_actions_per_recipe: usize) -> Self {
        Self {
            capacity,
            max_actions_per_recipe,
            recipes: Mutex::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a recipe for `intent_key`, marking it most-recently-used.
    pub fn lookup(&self, intent_key: &str) -> Option<Recipe> {
        let mut recipes = self.recipes.lock();
        let mut recipe = recipes.shift_remove(intent_key)?;
        recipe.hit_count += 1;
        recipe.last_used = now();
        recipes.insert(intent_key.to_string(), recipe.clone());
        Some(recipe)
    }

    /// Learn a new recipe from a successful model- or fallback-driven
    /// turn. Never learns the generic bucket, and never overwrites an
    /// existing recipe for the same intent (first-learned-wins — the
    /// earliest successful pattern for an intent tends to be the most
    /// general one).
    pub fn learn(
        &self,
        intent_key: &str,
        actions: &[ToolAction],
        response_template: String,
        params: &Params,
    ) -> bool {
        if intent_key == GENERIC || actions.is_empty() {
            return false;
        }

        let mut recipes = self.recipes.lock();
        if recipes.contains_key(intent_key) {
            return false;
        }

        let mut action_templates: Vec<ActionTemplate> = actions
            .iter()
            .map(|a| ActionTemplate {
                tool_name: a.tool_name.clone(),
                input_template: templatize_input(&a.input, params),
            })
            .collect();

        if action_templates.len() > self.max_actions_per_recipe {
            tracing::debug!(
                intent_key,
                dropped = action_templates.len() - self.max_actions_per_recipe,
                "truncating recipe to max_actions_per_recipe"
            );
            action_templates.truncate(self.max_actions_per_recipe);
        }

        let recipe = Recipe {
            recipe_id: format!("recipe-{intent_key}"),
            intent_key: intent_key.to_string(),
            action_templates,
            response_template: templatize_text(&response_template, params),
            hit_count: 0,
            created_at: now(),
            last_used: now(),
        };

        if recipes.len() >= self.capacity {
            recipes.shift_remove_index(0);
        }
        recipes.insert(intent_key.to_string(), recipe);
        true
    }

    /// Hydrate a recipe's templates against the current turn's params,
    /// producing concrete tool inputs and a response string.
    pub fn replay(&self, recipe: &Recipe, params: &Params) -> (Vec<(String, ToolInput)>, String) {
        let actions = recipe
            .action_templates
            .iter()
            .map(|t| (t.tool_name.clone(), hydrate_input(&t.input_template, params)))
            .collect();
        let response = hydrate_text(&recipe.response_template, params);
        (actions, response)
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

fn templatize_input(input: &ToolInput, params: &Params) -> ToolInput {
    input.iter().map(|(k, v)| (k.clone(), templatize_value(v, params))).collect()
}

fn templatize_value(value: &Value, params: &Params) -> Value {
    match value {
        Value::String(s) => {
            if Some(s.as_str()) == params.color_hex.as_deref() {
                Value::String("{{color}}".to_string())
            } else if Some(s.as_str()) == params.text.as_deref() {
                Value::String("{{text}}".to_string())
            } else if let Some(topic) = &params.topic {
                if !topic.is_empty() && s.contains(topic.as_str()) {
                    Value::String(s.replace(topic.as_str(), "{{topic}}"))
                } else {
                    value.clone()
                }
            } else {
                value.clone()
            }
        }
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            if params.x == Some(f) {
                Value::String("{{x}}".to_string())
            } else if params.y == Some(f) {
                Value::String("{{y}}".to_string())
            } else if params.grid_cols.map(|c| c as f64) == Some(f) {
                Value::String("{{gridCols}}".to_string())
            } else if params.grid_rows.map(|r| r as f64) == Some(f) {
                Value::String("{{gridRows}}".to_string())
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}

fn templatize_text(text: &str, params: &Params) -> String {
    match &params.topic {
        Some(topic) if !topic.is_empty() && text.contains(topic.as_str()) => {
            text.replace(topic.as_str(), "{{topic}}")
        }
        _ => text.to_string(),
    }
}

fn hydrate_input(template: &ToolInput, params: &Params) -> ToolInput {
    template.iter().map(|(k, v)| (k.clone(), hydrate_value(v, params))).collect()
}

fn hydrate_value(value: &Value, params: &Params) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    match s.as_str() {
        "{{color}}" => Value::String(params.color_hex.clone().unwrap_or_else(|| "#FFD700".to_string())),
        "{{text}}" => params.text.clone().map(Value::String).unwrap_or_else(|| value.clone()),
        "{{x}}" => Value::from(params.x.unwrap_or(100.0)),
        "{{y}}" => Value::from(params.y.unwrap_or(100.0)),
        "{{gridCols}}" => params.grid_cols.map(Value::from).unwrap_or_else(|| value.clone()),
        "{{gridRows}}" => params.grid_rows.map(Value::from).unwrap_or_else(|| value.clone()),
        _ if s.contains("{{topic}}") => match &params.topic {
            Some(topic) => Value::String(s.replace("{{topic}}", topic)),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn hydrate_text(text: &str, params: &Params) -> String {
    match &params.topic {
        Some(topic) => text.replace("{{topic}}", topic),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn action(tool_name: &str, input: &[(&str, Value)]) -> ToolAction {
        ToolAction {
            tool_name: tool_name.to_string(),
            input: input.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<HashMap<_, _>>(),
            result: "{}".to_string(),
        }
    }

    #[test]
    fn never_learns_generic() {
        let cache = CommandCache::new(10, 20);
        let learned = cache.learn(GENERIC, &[action("createObject", &[])], "ok".into(), &Params::default());
        assert!(!learned);
        assert!(cache.is_empty());
    }

    #[test]
    fn first_learned_wins_for_same_intent() {
        let cache = CommandCache::new(10, 20);
        let params = Params::default();
        assert!(cache.learn("create_sticky", &[action("createObject", &[])], "first".into(), &params));
        assert!(!cache.learn("create_sticky", &[action("createObject", &[])], "second".into(), &params));
        let recipe = cache.lookup("create_sticky").unwrap();
        assert_eq!(recipe.response_template, "first");
    }

    #[test]
    fn lookup_misses_do_not_panic_and_increment_hit_count_on_hit() {
        let cache = CommandCache::new(10, 20);
        assert!(cache.lookup("nothing_here").is_none());

        let params = Params::default();
        cache.learn("retro", &[action("createObject", &[])], "building a retro".into(), &params);
        let recipe = cache.lookup("retro").unwrap();
        assert_eq!(recipe.hit_count, 1);
    }

    #[test]
    fn evicts_least_recently_used_when_over_capacity() {
        let cache = CommandCache::new(2, 20);
        let params = Params::default();
        cache.learn("create_sticky", &[action("createObject", &[])], "a".into(), &params);
        cache.learn("create_rect", &[action("createObject", &[])], "b".into(), &params);
        cache.lookup("create_sticky"); // bump sticky to MRU, rect becomes LRU
        cache.learn("create_circle", &[action("createObject", &[])], "c".into(), &params);

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("create_sticky").is_some());
        assert!(cache.lookup("create_rect").is_none());
        assert!(cache.lookup("create_circle").is_some());
    }

    #[test]
    fn templatize_and_hydrate_round_trip_color_and_position() {
        let params = Params {
            color_hex: Some("#FF0000".to_string()),
            x: Some(40.0),
            y: Some(60.0),
            ..Default::default()
        };
        let act = action(
            "createObject",
            &[
                ("fill", Value::from("#FF0000")),
                ("x", Value::from(40.0)),
                ("y", Value::from(60.0)),
            ],
        );
        let cache = CommandCache::new(10, 20);
        cache.learn("create_sticky", &[act], "done".into(), &params);
        let recipe = cache.lookup("create_sticky").unwrap();

        let new_params = Params {
            color_hex: Some("#0000FF".to_string()),
            x: Some(100.0),
            y: Some(200.0),
            ..Default::default()
        };
        let (actions, _) = cache.replay(&recipe, &new_params);
        let (_, hydrated) = &actions[0];
        assert_eq!(hydrated["fill"], Value::from("#0000FF"));
        assert_eq!(hydrated["x"], Value::from(100.0));
        assert_eq!(hydrated["y"], Value::from(200.0));
    }

    #[test]
    fn replay_defaults_missing_position_and_color() {
        let params = Params { x: Some(40.0), y: Some(60.0), color_hex: Some("#FF0000".to_string()), ..Default::default() };
        let act = action(
            "createObject",
            &[("fill", Value::from("#FF0000")), ("x", Value::from(40.0)), ("y", Value::from(60.0))],
        );
        let cache = CommandCache::new(10, 20);
        cache.learn("create_sticky", &[act], "done".into(), &params);
        let recipe = cache.lookup("create_sticky").unwrap();

        let (actions, _) = cache.replay(&recipe, &Params::default());
        let (_, hydrated) = &actions[0];
        assert_eq!(hydrated["fill"], Value::from("#FFD700"));
        assert_eq!(hydrated["x"], Value::from(100.0));
        assert_eq!(hydrated["y"], Value::from(100.0));
    }

    proptest::proptest! {
        #[test]
        fn hydrate_with_same_params_restores_original_position(x in -1000.0f64..1000.0, y in -1000.0f64..1000.0) {
            let params = Params { x: Some(x), y: Some(y), ..Default::default() };
            let act = action("createObject", &[("x", Value::from(x)), ("y", Value::from(y))]);
            let cache = CommandCache::new(10, 20);
            cache.learn("create_sticky", &[act], "done".into(), &params);
            let recipe = cache.lookup("create_sticky").unwrap();

            let (actions, _) = cache.replay(&recipe, &params);
            let (_, hydrated) = &actions[0];
            prop_assert_eq!(hydrated["x"].as_f64().unwrap(), x);
            prop_assert_eq!(hydrated["y"].as_f64().unwrap(), y);
        }
    }
}
