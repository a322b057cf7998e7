//! Truncation of every method body reachable from a module.
//!
//! The type tree is walked with an explicit work stack in pre-order, so nesting depth is not
//! bounded by the call stack. For each type the members are visited through
//! [`HasOptionalBody`]: constructors, methods, property accessors, then event accessors.
//! Afterwards the module resources are dropped.

use crate::{
    module::{HasOptionalBody, Module, TypeDef},
    observer::{Event, NullObserver, Observer},
};

/// Counters collected while stripping a module
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StripStats {
    /// Types visited, nested ones included
    pub types_visited: usize,
    /// Members visited
    pub members_visited: usize,
    /// Bodies that lost at least one instruction or handler
    pub bodies_truncated: usize,
    /// Instructions removed over all bodies
    pub instructions_removed: usize,
    /// Resources removed
    pub resources_removed: usize,
}

/// Truncate all bodies and drop all resources of `module`
pub fn strip(module: &mut Module) -> StripStats {
    strip_with(module, &NullObserver)
}

/// As [`strip`], reporting every cleared type and member to `observer`
pub fn strip_with(module: &mut Module, observer: &dyn Observer) -> StripStats {
    let mut stats = StripStats::default();

    let mut stack: Vec<&mut TypeDef> = module.types.iter_mut().rev().collect();
    while let Some(ty) = stack.pop() {
        stats.types_visited += 1;

        for member in ty.members_mut() {
            stats.members_visited += 1;
            clear_member(member, observer, &mut stats);
        }

        observer.notify(&Event::TypeCleared {
            name: &ty.full_name,
        });
        stack.extend(ty.nested.iter_mut().rev());
    }

    stats.resources_removed = module.resources.len();
    module.resources.clear();
    observer.notify(&Event::ResourcesCleared {
        count: stats.resources_removed,
    });

    stats
}

fn clear_member(member: &mut dyn HasOptionalBody, observer: &dyn Observer, stats: &mut StripStats) {
    if member.body_count() == 0 {
        return;
    }

    let mut removed = 0;
    member.for_each_body_mut(&mut |_, body| {
        if !body.is_empty() {
            removed += body.instruction_count();
            body.truncate();
            stats.bodies_truncated += 1;
        }
    });
    stats.instructions_removed += removed;

    observer.notify(&Event::MemberCleared {
        kind: member.kind(),
        name: member.name(),
        instructions: removed,
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{module::MemberKind, test::builder::AssemblyBuilder};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Observer for Recorder {
        fn notify(&self, event: &Event<'_>) {
            let line = match event {
                Event::TypeCleared { name } => format!("type {name}"),
                Event::MemberCleared {
                    kind,
                    name,
                    instructions,
                } => format!("{kind} {name} {instructions}"),
                Event::ResourcesCleared { count } => format!("resources {count}"),
                _ => return,
            };
            self.0.lock().unwrap().push(line);
        }
    }

    fn bodies(module: &Module) -> Vec<usize> {
        module
            .all_methods()
            .into_iter()
            .filter_map(|method| method.body.as_ref())
            .map(|body| body.instruction_count())
            .collect()
    }

    #[test]
    fn foo_bar() {
        let image = AssemblyBuilder::new("Scenario")
            .class("", "Foo", |foo| {
                foo.ctor()
                    .method("Run", true)
                    .nested("Bar", |bar| bar.ctor().method("Walk", true))
            })
            .resource("Strings.resources", b"payload")
            .build();
        let mut module = Module::from_mem(image).unwrap();

        let recorder = Recorder::default();
        let stats = strip_with(&mut module, &recorder);

        assert_eq!(stats.types_visited, 3);
        assert_eq!(stats.members_visited, 4);
        assert_eq!(stats.bodies_truncated, 4);
        assert_eq!(stats.instructions_removed, 16);
        assert_eq!(stats.resources_removed, 1);
        assert!(module.resources.is_empty());
        assert!(bodies(&module).iter().all(|&count| count == 0));

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "type <Module>",
                "Constructor .ctor 5",
                "Method Run 3",
                "type Foo",
                "Constructor .ctor 5",
                "Method Walk 3",
                "type Foo/Bar",
                "resources 1",
            ]
        );
    }

    #[test]
    fn accessors_and_depth() {
        let image = AssemblyBuilder::new("Deep")
            .class("Deep", "Level1", |one| {
                one.property_with_other("Value").event("Changed").nested("Level2", |two| {
                    two.method("Two", true)
                        .nested("Level3", |three| three.static_ctor().method("Three", true))
                })
            })
            .build();
        let mut module = Module::from_mem(image).unwrap();
        assert!(bodies(&module).iter().all(|&count| count > 0));

        let stats = strip(&mut module);
        assert_eq!(stats.types_visited, 4);
        assert!(bodies(&module).iter().all(|&count| count == 0));

        let level1 = module.find_type("Deep.Level1").unwrap();
        let property = &level1.properties[0];
        assert!(property.accessors().all(|method| method.body.as_ref().unwrap().is_empty()));
        assert!(level1.events[0]
            .accessors()
            .all(|method| method.body.as_ref().unwrap().is_empty()));
        assert_eq!(level1.members().filter(|m| m.kind() == MemberKind::Event).count(), 1);
    }

    #[test]
    fn idempotent() {
        let image = AssemblyBuilder::new("Twice")
            .class("", "Foo", |foo| foo.ctor().method("Abstract", false))
            .build();
        let mut module = Module::from_mem(image).unwrap();

        let first = strip(&mut module);
        assert_eq!(first.bodies_truncated, 1);

        let second = strip(&mut module);
        assert_eq!(second.bodies_truncated, 0);
        assert_eq!(second.instructions_removed, 0);
        assert_eq!(second.types_visited, first.types_visited);
        assert_eq!(second.members_visited, first.members_visited);
    }
}
