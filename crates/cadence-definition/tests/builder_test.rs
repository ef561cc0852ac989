//! Builder behavior against a registry-backed description.

use std::cell::Cell;
use std::sync::{Arc, Mutex};

use cadence_config::{Arguments, CompletionPolicy, Options};
use cadence_definition::{
  Builder, Definition, DefinitionError, Job, NO_BLOCK, WorkflowDescription,
};
use cadence_workflow::{JobRef, Node, Process, ProcessKind, Task, TaskKind};
use serde_json::{Value, json};

struct Mailer;

impl Job for Mailer {
  fn name(&self) -> &str {
    "Mailer"
  }

  fn perform(&self, _args: &Arguments) -> anyhow::Result<()> {
    Ok(())
  }
}

/// Description with one step, one job, and an iterator yielding `count`
/// items (`[0]`, `[1]`, ...).
fn definition_yielding(count: usize) -> Definition {
  Definition::new("orders")
    .step("task_method", |_| Ok(()))
    .iterator("iterator_method", move |_, out| {
      for i in 0..count {
        out.emit(vec![json!(i)])?;
      }
      Ok(())
    })
    .job(Mailer)
}

fn definition() -> Definition {
  definition_yielding(3)
}

fn values() -> Vec<Value> {
  vec![
    json!("arg1"),
    json!("arg2"),
    json!({"option": 1, "another": false}),
  ]
}

fn root() -> Process {
  Process::sequential("orders", Options::new())
}

fn step_methods(process: &Process) -> Vec<String> {
  process
    .children
    .iter()
    .filter_map(Node::as_task)
    .filter_map(|task| match &task.kind {
      TaskKind::Step { method, .. } => Some(method.clone()),
      _ => None,
    })
    .collect()
}

#[test]
fn test_assigns_attributes() {
  let definition = definition();
  let mut process = root();
  let process_id = process.id.clone();

  let builder = Builder::from_values(&mut process, &definition, values());

  assert_eq!(builder.process().id, process_id);
  assert_eq!(builder.definition().name(), "orders");
  assert_eq!(builder.args(), &[json!("arg1"), json!("arg2")]);
  assert_eq!(
    builder.options(),
    &Options::new().with("option", 1).with("another", false)
  );
}

#[test]
fn test_without_trailing_object_all_values_are_args() {
  let definition = definition();
  let mut process = root();

  let builder = Builder::from_values(&mut process, &definition, vec![json!(1), json!("two")]);

  assert_eq!(builder.args(), &[json!(1), json!("two")]);
  assert!(builder.options().is_empty());
}

mod option {
  use super::*;

  fn run(key: &str) -> usize {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let calls = Cell::new(0);
    builder
      .option(key, |_| {
        calls.set(calls.get() + 1);
        Ok(())
      })
      .unwrap();
    calls.get()
  }

  #[test]
  fn test_invokes_block_for_set_option() {
    assert_eq!(run("option"), 1);
  }

  #[test]
  fn test_skips_block_for_false_option() {
    assert_eq!(run("another"), 0);
  }

  #[test]
  fn test_skips_block_for_unspecified_option() {
    assert_eq!(run("unspecified"), 0);
  }

  #[test]
  fn test_block_appends_to_enclosing_process() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .option("option", |b| b.task("task_method", Options::new()))
        .unwrap();
    }
    assert_eq!(step_methods(&process), vec!["task_method"]);
  }
}

mod sequential {
  use super::*;

  #[test]
  fn test_invokes_block() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let calls = Cell::new(0);
    builder
      .sequential(
        Options::new(),
        Some(|_: &mut Builder<'_>| {
          calls.set(calls.get() + 1);
          Ok(())
        }),
      )
      .unwrap();
    assert_eq!(calls.get(), 1);
  }

  #[test]
  fn test_creates_sequential_process() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .sequential(
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            // nested builders share the description and arguments
            assert_eq!(b.definition().name(), "orders");
            assert_eq!(b.args(), &[json!("arg1"), json!("arg2")]);
            b.task("task_method", Options::new())
          }),
        )
        .unwrap();
    }

    assert_eq!(process.len(), 1);
    let child = process.children[0].as_process().unwrap();
    assert_eq!(child.kind, ProcessKind::Sequential);
    assert_eq!(child.definition, "orders");
    assert!(child.options.is_empty());
    assert_eq!(step_methods(child), vec!["task_method"]);
  }

  #[test]
  fn test_fails_without_block() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder.sequential(Options::new(), NO_BLOCK).unwrap_err();
      assert!(matches!(
        err,
        DefinitionError::MissingBlock {
          operation: "sequential"
        }
      ));
    }
    assert!(process.is_empty());
  }

  #[test]
  fn test_failing_block_appends_nothing() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder
        .sequential(
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            b.task("task_method", Options::new())?;
            b.task("undefined", Options::new())
          }),
        )
        .unwrap_err();
      assert!(matches!(err, DefinitionError::UnresolvedBehavior { .. }));
    }
    assert!(process.is_empty());
  }
}

mod concurrent {
  use super::*;

  #[test]
  fn test_invokes_block() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let calls = Cell::new(0);
    builder
      .concurrent(
        CompletionPolicy::default(),
        Options::new(),
        Some(|_: &mut Builder<'_>| {
          calls.set(calls.get() + 1);
          Ok(())
        }),
      )
      .unwrap();
    assert_eq!(calls.get(), 1);
  }

  #[test]
  fn test_creates_concurrent_process_with_policy() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .concurrent(
          CompletionPolicy::First,
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            b.task("task_method", Options::new())?;
            b.task("task_method", Options::new())
          }),
        )
        .unwrap();
    }

    let child = process.children[0].as_process().unwrap();
    assert_eq!(
      child.kind,
      ProcessKind::Concurrent {
        policy: CompletionPolicy::First
      }
    );
    assert_eq!(child.definition, "orders");
    assert_eq!(child.len(), 2);
  }

  #[test]
  fn test_default_policy_is_all() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .concurrent(
          CompletionPolicy::default(),
          Options::new(),
          Some(|_: &mut Builder<'_>| Ok(())),
        )
        .unwrap();
    }

    let child = process.children[0].as_process().unwrap();
    assert_eq!(child.policy(), Some(CompletionPolicy::All));
    assert!(child.is_empty());
  }

  #[test]
  fn test_fails_without_block() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder
        .concurrent(CompletionPolicy::All, Options::new(), NO_BLOCK)
        .unwrap_err();
      assert!(matches!(
        err,
        DefinitionError::MissingBlock {
          operation: "concurrent"
        }
      ));
    }
    assert!(process.is_empty());
  }
}

mod for_each {
  use super::*;

  fn expand(count: usize) -> (Process, usize) {
    let definition = definition_yielding(count);
    let mut process = root();
    let calls = Cell::new(0);
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .for_each(
          "iterator_method",
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            calls.set(calls.get() + 1);
            b.task("task_method", Options::new())
          }),
        )
        .unwrap();
    }
    (process, calls.get())
  }

  #[test]
  fn test_creates_tasks_for_each_returned_item() {
    let (process, calls) = expand(3);
    assert_eq!(calls, 3);
    assert_eq!(process.len(), 3);
  }

  #[test]
  fn test_single_item() {
    let (process, calls) = expand(1);
    assert_eq!(calls, 1);
    assert_eq!(process.len(), 1);
  }

  #[test]
  fn test_no_items() {
    let (process, calls) = expand(0);
    assert_eq!(calls, 0);
    assert!(process.is_empty());
  }

  #[test]
  fn test_items_become_task_arguments_in_yield_order() {
    let (process, _) = expand(3);

    let args: Vec<Value> = process
      .tasks()
      .map(|task| task.args().unwrap().args[0].clone())
      .collect();
    assert_eq!(args, vec![json!(0), json!(1), json!(2)]);
  }

  #[test]
  fn test_iterator_receives_builder_arguments_and_options() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let seen = received.clone();
    let definition = Definition::new("orders")
      .step("task_method", |_| Ok(()))
      .iterator("iterator_method", move |args, _| {
        seen.lock().unwrap().push(args.clone());
        Ok(())
      });

    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());
    builder
      .for_each(
        "iterator_method",
        Options::new().with("batch", 10),
        Some(|b: &mut Builder<'_>| b.task("task_method", Options::new())),
      )
      .unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].args, vec![json!("arg1"), json!("arg2")]);
    assert!(received[0].options.is_set("option"));
    assert_eq!(received[0].options.get("batch"), Some(&json!(10)));
  }

  #[test]
  fn test_fails_if_iterator_is_missing() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let err = builder
      .for_each(
        "",
        Options::new(),
        Some(|b: &mut Builder<'_>| b.task("task_method", Options::new())),
      )
      .unwrap_err();
    assert!(matches!(
      err,
      DefinitionError::MissingArgument {
        argument: "iterator",
        ..
      }
    ));
  }

  #[test]
  fn test_fails_if_iterator_is_not_defined() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let err = builder
      .for_each(
        "undefined_iterator",
        Options::new(),
        Some(|b: &mut Builder<'_>| b.task("task_method", Options::new())),
      )
      .unwrap_err();
    assert!(matches!(
      err,
      DefinitionError::UnresolvedBehavior { identifier, .. } if identifier == "undefined_iterator"
    ));
  }

  #[test]
  fn test_fails_if_block_is_missing() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let err = builder
      .for_each("iterator_method", Options::new(), NO_BLOCK)
      .unwrap_err();
    assert!(matches!(
      err,
      DefinitionError::MissingArgument {
        argument: "block",
        ..
      }
    ));
  }

  #[test]
  fn test_error_in_block_aborts_iteration() {
    let definition = definition_yielding(5);
    let mut process = root();
    let calls = Cell::new(0);
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder
        .for_each(
          "iterator_method",
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            calls.set(calls.get() + 1);
            b.task("undefined", Options::new())
          }),
        )
        .unwrap_err();
      assert!(matches!(err, DefinitionError::UnresolvedBehavior { .. }));
    }
    assert_eq!(calls.get(), 1);
    assert!(process.is_empty());
  }

  #[test]
  fn test_error_on_later_item_keeps_no_items() {
    let definition = definition_yielding(3);
    let mut process = root();
    process.push(Task::step("task_method", Arguments::default(), Options::new()));
    let existing = process.children[0].id().to_string();
    let calls = Cell::new(0);
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder
        .for_each(
          "iterator_method",
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            calls.set(calls.get() + 1);
            if b.args() == [json!(1)] {
              b.task("undefined", Options::new())
            } else {
              b.task("task_method", Options::new())
            }
          }),
        )
        .unwrap_err();
      assert!(matches!(err, DefinitionError::UnresolvedBehavior { .. }));
    }
    assert_eq!(calls.get(), 2);
    assert_eq!(process.len(), 1);
    assert_eq!(process.children[0].id(), existing);
  }
}

mod task {
  use super::*;

  #[test]
  fn test_creates_a_task() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder.task("task_method", Options::new()).unwrap();
    }

    assert_eq!(process.len(), 1);
    let task = process.children[0].as_task().unwrap();
    match &task.kind {
      TaskKind::Step { method, args } => {
        assert_eq!(method, "task_method");
        assert_eq!(args, &Arguments::from_values(values()));
      }
      other => panic!("expected step task, got {:?}", other),
    }
    assert!(task.options.is_empty());
  }

  #[test]
  fn test_carries_call_options() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder
        .task("task_method", Options::new().with("retry", 3))
        .unwrap();
    }

    let task = process.children[0].as_task().unwrap();
    assert_eq!(task.options, Options::new().with("retry", 3));
  }

  #[test]
  fn test_fails_if_task_method_is_missing() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder.task("", Options::new()).unwrap_err();
      assert!(matches!(
        err,
        DefinitionError::InvalidArgument {
          operation: "task",
          ..
        }
      ));
    }
    assert!(process.is_empty());
  }

  #[test]
  fn test_fails_if_task_method_is_not_defined() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let err = builder.task("undefined", Options::new()).unwrap_err();
    assert!(matches!(err, DefinitionError::UnresolvedBehavior { .. }));
  }
}

mod job {
  use super::*;

  #[test]
  fn test_creates_a_job() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder.job(JobRef::new("Mailer"), Options::new()).unwrap();
    }

    assert_eq!(process.len(), 1);
    let task = process.children[0].as_task().unwrap();
    match &task.kind {
      TaskKind::Job { job, args } => {
        assert_eq!(job, &JobRef::new("Mailer"));
        assert_eq!(args, &Arguments::from_values(values()));
      }
      other => panic!("expected job task, got {:?}", other),
    }
  }

  #[test]
  fn test_fails_if_job_is_missing() {
    let definition = definition();
    let mut process = root();
    let mut builder = Builder::from_values(&mut process, &definition, values());

    let err = builder.job(JobRef::new(""), Options::new()).unwrap_err();
    assert!(matches!(
      err,
      DefinitionError::InvalidArgument {
        operation: "job",
        ..
      }
    ));
  }

  #[test]
  fn test_fails_if_object_is_not_a_job() {
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder.job(JobRef::new("Object"), Options::new()).unwrap_err();
      assert!(matches!(
        err,
        DefinitionError::InvalidArgument {
          operation: "job",
          ..
        }
      ));
    }
    assert!(process.is_empty());
  }
}

mod sub_process {
  use super::*;

  fn sub_definition(received: Arc<Mutex<Vec<Arguments>>>) -> Definition {
    Definition::new("shipping")
      .step("label", |_| Ok(()))
      .process(move |b| {
        received.lock().unwrap().push(b.arguments().clone());
        b.task("label", Options::new())
      })
  }

  #[test]
  fn test_builds_sub_process_with_builder_arguments() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sub = sub_definition(received.clone());
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder.sub_process(&sub, Options::new()).unwrap();
    }

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], Arguments::from_values(values()));
  }

  #[test]
  fn test_creates_a_sub_process_task() {
    let sub = sub_definition(Arc::new(Mutex::new(Vec::new())));
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      builder.sub_process(&sub, Options::new()).unwrap();
    }

    assert_eq!(process.len(), 1);
    let task = process.children[0].as_task().unwrap();
    assert!(task.options.is_empty());
    match &task.kind {
      TaskKind::SubProcess { process } => {
        assert_eq!(process.definition, "shipping");
        assert_eq!(step_methods(process), vec!["label"]);
      }
      other => panic!("expected sub-process task, got {:?}", other),
    }
  }

  #[test]
  fn test_propagates_build_errors() {
    let sub = Definition::new("empty");
    let definition = definition();
    let mut process = root();
    {
      let mut builder = Builder::from_values(&mut process, &definition, values());
      let err = builder.sub_process(&sub, Options::new()).unwrap_err();
      assert!(matches!(err, DefinitionError::MissingBlock { .. }));
    }
    assert!(process.is_empty());
  }
}

#[test]
fn test_nested_tree() {
  let definition = definition_yielding(2).process(|b| {
    b.task("task_method", Options::new())?;
    b.concurrent(
      CompletionPolicy::All,
      Options::new(),
      Some(|b: &mut Builder<'_>| {
        b.for_each(
          "iterator_method",
          Options::new(),
          Some(|b: &mut Builder<'_>| {
            b.sequential(
              Options::new(),
              Some(|b: &mut Builder<'_>| {
                b.task("task_method", Options::new())?;
                b.job(JobRef::new("Mailer"), Options::new())
              }),
            )
          }),
        )
      }),
    )?;
    b.option("notify", |b| b.job(JobRef::new("Mailer"), Options::new()))
  });

  let process = definition
    .build_process(Arguments::from_values(vec![json!({"notify": true})]))
    .unwrap();

  assert_eq!(process.len(), 3);
  let fan = process.children[1].as_process().unwrap();
  assert_eq!(fan.len(), 2);
  for branch in &fan.children {
    assert_eq!(branch.as_process().unwrap().len(), 2);
  }
  // 1 leading step + 2 x (step + job) + trailing job
  assert_eq!(process.tasks().count(), 6);
}
