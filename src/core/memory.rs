use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::core::db::{Constraint, IdentityStore, StoreError, StoreResult};
use crate::models::models::{Post, Relation, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    relations: Vec<Relation>,
    posts: Vec<Post>,
}

impl Tables {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn users_in(&self, ids: impl Iterator<Item = String>) -> Vec<User> {
        ids.filter_map(|id| self.user(&id).cloned()).collect()
    }
}

/// Process-local store with the same constraints as the SQLite schema.
/// Each method holds the table lock for one statement.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl IdentityStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(Constraint::UserUsername));
        }
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(Constraint::UserEmail));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_relation(&self, relation: &Relation) -> StoreResult<()> {
        let mut tables = self.lock()?;
        for id in [&relation.follower_id, &relation.following_id] {
            if tables.user(id).is_none() {
                return Err(StoreError::ForeignKeyViolation(format!("relations -> users({id})")));
            }
        }
        let exists = tables.relations.iter().any(|r| {
            r.follower_id == relation.follower_id && r.following_id == relation.following_id
        });
        if exists {
            return Err(StoreError::UniqueViolation(Constraint::RelationPair));
        }
        tables.relations.push(relation.clone());
        Ok(())
    }

    async fn delete_relation(&self, follower_id: &str, following_id: &str) -> StoreResult<u64> {
        let mut tables = self.lock()?;
        let before = tables.relations.len();
        tables
            .relations
            .retain(|r| !(r.follower_id == follower_id && r.following_id == following_id));
        Ok((before - tables.relations.len()) as u64)
    }

    async fn following_ids(&self, follower_id: &str) -> StoreResult<Vec<String>> {
        let tables = self.lock()?;
        Ok(tables
            .relations
            .iter()
            .filter(|r| r.follower_id == follower_id)
            .map(|r| r.following_id.clone())
            .collect())
    }

    async fn following_of(&self, user_id: &str) -> StoreResult<Vec<User>> {
        let tables = self.lock()?;
        let ids = tables
            .relations
            .iter()
            .filter(|r| r.follower_id == user_id)
            .map(|r| r.following_id.clone());
        Ok(tables.users_in(ids))
    }

    async fn followers_of(&self, user_id: &str) -> StoreResult<Vec<User>> {
        let tables = self.lock()?;
        let ids = tables
            .relations
            .iter()
            .filter(|r| r.following_id == user_id)
            .map(|r| r.follower_id.clone());
        Ok(tables.users_in(ids))
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if tables.user(&post.author_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(format!(
                "posts -> users({})",
                post.author_id
            )));
        }
        tables.posts.push(post.clone());
        Ok(())
    }

    async fn posts_by_authors(&self, author_ids: &[String]) -> StoreResult<Vec<Post>> {
        let authors: HashSet<&str> = author_ids.iter().map(String::as_str).collect();
        let tables = self.lock()?;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| authors.contains(p.author_id.as_str()))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::helpers::{new_id, now};

    fn user(name: &str) -> User {
        User {
            id: new_id(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password: "hash".to_string(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn edge(from: &User, to: &User) -> Relation {
        Relation { follower_id: from.id.clone(), following_id: to.id.clone(), created_at: now() }
    }

    #[tokio::test]
    async fn rejects_duplicate_username_and_email() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();

        let mut same_name = user("alice");
        same_name.email = "other@example.com".into();
        assert_eq!(
            store.insert_user(&same_name).await,
            Err(StoreError::UniqueViolation(Constraint::UserUsername))
        );

        let mut same_email = user("other");
        same_email.email = alice.email.clone();
        assert_eq!(
            store.insert_user(&same_email).await,
            Err(StoreError::UniqueViolation(Constraint::UserEmail))
        );
    }

    #[tokio::test]
    async fn relations_are_unique_and_reference_users() {
        let store = MemoryStore::new();
        let (a, b) = (user("a"), user("b"));
        store.insert_user(&a).await.unwrap();
        store.insert_user(&b).await.unwrap();

        store.insert_relation(&edge(&a, &b)).await.unwrap();
        assert_eq!(
            store.insert_relation(&edge(&a, &b)).await,
            Err(StoreError::UniqueViolation(Constraint::RelationPair))
        );
        // reverse direction is a distinct edge
        store.insert_relation(&edge(&b, &a)).await.unwrap();

        let ghost = user("ghost");
        assert!(matches!(
            store.insert_relation(&edge(&a, &ghost)).await,
            Err(StoreError::ForeignKeyViolation(_))
        ));

        assert_eq!(store.delete_relation(&a.id, &b.id).await.unwrap(), 1);
        assert_eq!(store.delete_relation(&a.id, &b.id).await.unwrap(), 0);
        assert_eq!(store.followers_of(&b.id).await.unwrap(), vec![]);
        assert_eq!(store.followers_of(&a.id).await.unwrap(), vec![b.clone()]);
    }
}
