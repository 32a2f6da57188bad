use fibre_di::{global, resolve, resolve_set, RegisterError, Registry};
use std::sync::Arc;

// --- Abstraction and Implementations ---
trait MessageSender: Send + Sync {
  fn send(&self, to: &str, message: &str) -> String;
}

struct EmailSender;
impl MessageSender for EmailSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending email to {}: '{}'", to, message)
  }
}

struct SmsSender;
impl MessageSender for SmsSender {
  fn send(&self, to: &str, message: &str) -> String {
    format!("Sending SMS to {}: '{}'", to, message)
  }
}

fn senders(registry: &mut Registry) -> Result<(), RegisterError> {
  // Register both implementations under distinct qualifiers.
  registry.add_singleton_trait_with_name::<dyn MessageSender>("email", |_| Ok(Arc::new(EmailSender)))?;
  registry.add_singleton_trait_with_name::<dyn MessageSender>("sms", |_| Ok(Arc::new(SmsSender)))?;

  // ...and also contribute both to the set of every sender.
  registry.add_into_set::<dyn MessageSender>(|_| Ok(Arc::new(EmailSender)))?;
  registry.add_into_set::<dyn MessageSender>(|_| Ok(Arc::new(SmsSender)))
}

fn main() {
  global().init(&[&senders]).expect("bindings conflict");

  // Choose the implementation at the point of resolution.
  let email_notifier = resolve!(trait MessageSender, "email");
  let sms_notifier = resolve!(trait MessageSender, "sms");

  let result1 = email_notifier.send("test@example.com", "Hello from Fibre!");
  let result2 = sms_notifier.send("+123456789", "Hello from Fibre!");

  println!("{}", result1);
  println!("{}", result2);

  assert!(result1.contains("email"));
  assert!(result2.contains("SMS"));

  let everyone = resolve_set!(trait MessageSender);
  for sender in everyone.iter() {
    println!("{}", sender.send("all", "broadcast"));
  }
  assert_eq!(everyone.len(), 2);

  global().reset();
}
