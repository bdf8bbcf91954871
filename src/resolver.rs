//! Scope and symbol resolver.
//!
//! One left-to-right pass over a file's entities. The only state carried is
//! the ambient scope, the current class, and the last non-embedded entity,
//! which embedded enum members attach to.

use crate::model::Entity;
use crate::profile::{EnumPlacement, KindTable, LanguageProfile, Scope};
use crate::symbols::{ClassString, ContextString, SymbolString, UsingString};
use tracing::trace;

#[derive(Debug, Default)]
struct ScopeState {
    scope: Option<SymbolString>,
    class: Option<ClassString>,
    /// Index of the last non-embedded entity that kept its symbol.
    parent: Option<usize>,
}

/// Fill in symbols, classes and contexts. Entities whose title has no usable
/// symbol (such as `"."`) are removed.
pub fn resolve(entities: &mut Vec<Entity>, kinds: &KindTable, profile: &LanguageProfile, usings: &[UsingString]) {
    let mut state = ScopeState::default();
    let mut keep = vec![true; entities.len()];

    for i in 0..entities.len() {
        let Some(title) = SymbolString::from_plain_text(&entities[i].title) else {
            trace!(title = %entities[i].title, "dropping entity without a symbol");
            keep[i] = false;
            continue;
        };
        let kind = kinds.get(&entities[i].kind);
        let is_enum = kind.is_some_and(|k| k.is_enum);
        let ambient = ContextString::scoped(state.scope.as_ref(), usings);

        if entities[i].is_embedded {
            let enum_parent = state
                .parent
                .filter(|&p| kinds.get(&entities[p].kind).is_some_and(|k| k.is_enum));
            let symbol = match (enum_parent, profile.enum_values) {
                (Some(_), EnumPlacement::Global) => {
                    set_contexts(&mut entities[i], ContextString::global(usings), ContextString::global(usings));
                    title
                }
                (Some(p), EnumPlacement::UnderType) => {
                    let parent_symbol = entities[p].symbol.clone();
                    let context = ContextString::scoped(parent_symbol.as_ref(), usings);
                    set_contexts(&mut entities[i], context.clone(), context);
                    SymbolString::under(parent_symbol.as_ref(), &title)
                }
                _ => {
                    set_contexts(&mut entities[i], ambient.clone(), ambient);
                    SymbolString::under(state.scope.as_ref(), &title)
                }
            };
            entities[i].symbol = Some(symbol);
            entities[i].class = state.class.clone();
            continue;
        }

        match kind.map(|k| k.scope).unwrap_or_default() {
            Scope::Normal => {
                let symbol = SymbolString::under(state.scope.as_ref(), &title);
                let body = if is_enum {
                    enum_body_context(profile.enum_values, &symbol, &ambient, usings)
                } else {
                    ambient.clone()
                };
                set_contexts(&mut entities[i], ambient, body);
                entities[i].symbol = Some(symbol);
                entities[i].class = state.class.clone();
            }
            Scope::AlwaysGlobal => {
                set_contexts(&mut entities[i], ambient.clone(), ambient);
                entities[i].symbol = Some(title);
                entities[i].class = state.class.clone();
            }
            Scope::Start => {
                let class = kind
                    .and_then(|k| k.hierarchy.as_deref())
                    .map(|hierarchy| ClassString::new(hierarchy, title.clone(), profile.case_sensitive));
                set_contexts(
                    &mut entities[i],
                    ContextString::global(usings),
                    ContextString::scoped(Some(&title), usings),
                );
                entities[i].class = class.clone();
                state.scope = Some(title.clone());
                state.class = class;
                entities[i].symbol = Some(title);
            }
            Scope::End => {
                set_contexts(&mut entities[i], ContextString::global(usings), ContextString::global(usings));
                entities[i].class = None;
                state.scope = None;
                state.class = None;
                entities[i].symbol = Some(title);
            }
        }
        state.parent = Some(i);
    }

    let mut flags = keep.into_iter();
    entities.retain(|_| flags.next().unwrap_or(true));
}

/// Body context of an enum, where its members are looked up.
fn enum_body_context(
    placement: EnumPlacement,
    symbol: &SymbolString,
    ambient: &ContextString,
    usings: &[UsingString],
) -> ContextString {
    match placement {
        EnumPlacement::UnderType => ContextString::scoped(Some(symbol), usings),
        EnumPlacement::Global => ContextString::global(usings),
        EnumPlacement::UnderParent => ambient.clone(),
    }
}

fn set_contexts(entity: &mut Entity, prototype: ContextString, body: ContextString) {
    entity.prototype_context = prototype;
    entity.body_context = body;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(placement: EnumPlacement) -> LanguageProfile {
        let mut profile = LanguageProfile::new("test");
        profile.enum_values = placement;
        profile
    }

    fn run(entities: &mut Vec<Entity>, placement: EnumPlacement) {
        resolve(entities, &KindTable::default(), &profile(placement), &[]);
    }

    fn symbols(entities: &[Entity]) -> Vec<String> {
        entities
            .iter()
            .map(|e| e.symbol.as_ref().map(|s| s.to_string()).unwrap_or_default())
            .collect()
    }

    fn scope_of(context: &ContextString) -> Option<String> {
        context.scope.as_ref().map(|s| s.to_string())
    }

    #[test]
    fn scope_start_and_end() {
        let mut entities = vec![
            Entity::new("ClassA", "class", 1),
            Entity::new("MethodA", "function", 5),
            Entity::new("ClassEnd", "section", 9),
            Entity::new("MethodB", "function", 12),
        ];
        run(&mut entities, EnumPlacement::UnderType);
        assert_eq!(symbols(&entities), vec!["ClassA", "ClassA.MethodA", "ClassEnd", "MethodB"]);

        assert!(entities[0].prototype_context.is_global());
        assert_eq!(scope_of(&entities[0].body_context).as_deref(), Some("ClassA"));
        assert_eq!(entities[0].class.as_ref().map(|c| c.hierarchy.as_str()), Some("class"));
        assert_eq!(scope_of(&entities[1].prototype_context).as_deref(), Some("ClassA"));
        assert_eq!(entities[1].class, entities[0].class);
        assert!(entities[3].class.is_none());
        assert!(entities[3].body_context.is_global());
    }

    #[test]
    fn enum_members_under_type() {
        let mut entities = vec![
            Entity::new("Color", "enumeration", 1),
            Entity::new("Red", "constant", 2).embedded(),
            Entity::new("Green", "constant", 3).embedded(),
        ];
        run(&mut entities, EnumPlacement::UnderType);
        assert_eq!(symbols(&entities), vec!["Color", "Color.Red", "Color.Green"]);
        assert_eq!(scope_of(&entities[0].body_context).as_deref(), Some("Color"));
        assert_eq!(scope_of(&entities[1].body_context).as_deref(), Some("Color"));
    }

    #[test]
    fn enum_members_global() {
        let mut entities = vec![
            Entity::new("Outer", "class", 1),
            Entity::new("Color", "enumeration", 4),
            Entity::new("Red", "constant", 5).embedded(),
            Entity::new("Green", "constant", 6).embedded(),
        ];
        run(&mut entities, EnumPlacement::Global);
        assert_eq!(symbols(&entities), vec!["Outer", "Outer.Color", "Red", "Green"]);
        assert!(entities[2].prototype_context.is_global());
    }

    #[test]
    fn enum_members_under_parent() {
        let mut entities = vec![
            Entity::new("Namespace", "namespace", 1),
            Entity::new("Color", "enumeration", 3),
            Entity::new("Red", "constant", 4).embedded(),
            Entity::new("Green", "constant", 5).embedded(),
        ];
        run(&mut entities, EnumPlacement::UnderParent);
        assert_eq!(
            symbols(&entities),
            vec!["Namespace", "Namespace.Color", "Namespace.Red", "Namespace.Green"]
        );
        // Namespaces are not in a class hierarchy.
        assert!(entities[0].class.is_none());
    }

    #[test]
    fn embedded_after_non_enum_is_normal() {
        let mut entities = vec![
            Entity::new("Shape", "class", 1),
            Entity::new("Flags", "type", 3),
            Entity::new("Solid", "constant", 4).embedded(),
        ];
        run(&mut entities, EnumPlacement::Global);
        assert_eq!(symbols(&entities), vec!["Shape", "Shape.Flags", "Shape.Solid"]);
    }

    #[test]
    fn always_global_keeps_class_and_scope() {
        let mut entities = vec![
            Entity::new("Widget", "class", 1),
            Entity::new("MAX_SIZE", "macro", 3),
            Entity::new("Draw", "function", 5),
        ];
        run(&mut entities, EnumPlacement::UnderType);
        assert_eq!(symbols(&entities), vec!["Widget", "MAX_SIZE", "Widget.Draw"]);
        assert_eq!(entities[1].class, entities[0].class);
        assert_eq!(scope_of(&entities[1].body_context).as_deref(), Some("Widget"));
    }

    #[test]
    fn classes_compare_by_language_case_rules() {
        let mut insensitive = profile(EnumPlacement::UnderType);
        insensitive.case_sensitive = false;
        let mut entities = vec![Entity::new("Widget", "class", 1), Entity::new("WIDGET", "class", 9)];
        resolve(&mut entities, &KindTable::default(), &insensitive, &[]);
        assert_eq!(entities[0].class, entities[1].class);

        let mut sensitive = profile(EnumPlacement::UnderType);
        sensitive.case_sensitive = true;
        let mut entities = vec![Entity::new("Widget", "class", 1), Entity::new("WIDGET", "class", 9)];
        resolve(&mut entities, &KindTable::default(), &sensitive, &[]);
        assert_ne!(entities[0].class, entities[1].class);
    }

    #[test]
    fn drops_entities_without_symbols() {
        let mut entities = vec![
            Entity::new(".", "function", 1),
            Entity::new("Kept", "function", 2),
        ];
        run(&mut entities, EnumPlacement::UnderType);
        assert_eq!(symbols(&entities), vec!["Kept"]);
    }

    #[test]
    fn usings_reach_every_context() {
        let using = UsingString::AddPrefix {
            prefix: SymbolString::from_plain_text("System").unwrap(),
        };
        let mut entities = vec![Entity::new("Main", "class", 1), Entity::new("Run", "function", 2)];
        resolve(
            &mut entities,
            &KindTable::default(),
            &profile(EnumPlacement::UnderType),
            std::slice::from_ref(&using),
        );
        for entity in &entities {
            assert_eq!(entity.prototype_context.usings, vec![using.clone()]);
            assert_eq!(entity.body_context.usings, vec![using.clone()]);
        }
    }
}
