use std::marker::PhantomData;

use crate::cursor::Cursor;
use crate::decode::Decodable;
use crate::error::{CursorError, Result};

impl Cursor {
    /// Decode every remaining row into `result` and close the cursor.
    ///
    /// Elements already in `result` are reused as decode targets before new
    /// ones are pushed; on return its length is the number of rows read.
    pub fn all<T: Decodable + Default>(&self, result: &mut Vec<T>) -> Result<()> {
        let mut i = 0;
        loop {
            if i < result.len() {
                if !self.next(&mut result[i]) {
                    break;
                }
            } else {
                let mut elem = T::default();
                if !self.next(&mut elem) {
                    break;
                }
                result.push(elem);
            }
            i += 1;
        }
        result.truncate(i);

        if let Some(err) = self.err() {
            let _ = self.close();
            return Err(err);
        }
        self.close()
    }

    /// Decode a single row into `result` and close the cursor.
    ///
    /// Fails with [`CursorError::EmptyResult`] when there is no row or the
    /// row is null.
    pub fn one<T: Decodable>(&self, result: &mut T) -> Result<()> {
        if self.is_nil() {
            let _ = self.close();
            return Err(CursorError::EmptyResult);
        }

        let has_result = self.next(result);

        if let Some(err) = self.err() {
            let _ = self.close();
            return Err(err);
        }
        self.close()?;

        if !has_result {
            return Err(CursorError::EmptyResult);
        }
        Ok(())
    }

    /// Iterate the remaining rows as owned values. An iteration error is
    /// yielded once, as the last item.
    pub fn rows<T: Decodable + Default>(&self) -> Rows<'_, T> {
        Rows {
            cursor: self,
            done: false,
            _marker: PhantomData,
        }
    }
}

/// Iterator returned by [`Cursor::rows`].
pub struct Rows<'a, T> {
    cursor: &'a Cursor,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Decodable + Default> Iterator for Rows<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut value = T::default();
        if self.cursor.next(&mut value) {
            return Some(Ok(value));
        }
        self.done = true;
        self.cursor.err().map(Err)
    }
}
